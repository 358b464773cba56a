//! Python extension module exposing the perturbation reductions as `volcstat._lib`.
//!
//! The Rust API lives in [`volcstat_core`]; this crate only assembles the extension.

pub use volcstat_core::*;

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::wrap_pymodule;
    use volcstat_core::python::core;

    #[pymodule]
    #[pyo3(name = "_lib")]
    fn volcstat(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add("__version__", env!("CARGO_PKG_VERSION"))?;
        m.add_wrapped(wrap_pymodule!(core))?;

        set_path(m, "volcstat._lib.core", "core")?;

        Ok(())
    }

    fn set_path(m: &Bound<'_, PyModule>, path: &str, module: &str) -> PyResult<()> {
        let code = format!(
            "\
import sys
sys.modules['{path}'] = {module}
    "
        );
        m.py().run_bound(&code, None, Some(&m.dict()))
    }
}
