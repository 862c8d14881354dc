//! map_optimizer::builders: L-BFGS solver construction.
//!
//! Builders apply the memory size and optional tolerances from
//! [`MapOptions`]; the initial point and iteration cap are set by the
//! runner ([`run_lbfgs`](super::run::run_lbfgs)).
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    map_optimizer::{
        traits::MapOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search.
pub fn build_optimizer_hager_zhang(opts: &MapOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search.
pub fn build_optimizer_more_thuente(opts: &MapOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances. Absent values
/// leave Argmin's defaults in place.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MapOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::map_optimizer::traits::{LineSearcher, Tolerances};

    #[test]
    // Purpose
    // -------
    // Both builders accept default and explicit settings.
    fn builders_accept_default_and_explicit_settings() {
        let defaults = MapOptions::default();
        assert!(build_optimizer_more_thuente(&defaults).is_ok());
        assert!(build_optimizer_hager_zhang(&defaults).is_ok());

        let tols = Tolerances::new(Some(1e-8), Some(1e-12), Some(10)).unwrap();
        let opts = MapOptions::new(tols, LineSearcher::HagerZhang, false, Some(3)).unwrap();
        assert!(build_optimizer_hager_zhang(&opts).is_ok());
    }
}
