//! `:python` filter support through an embedded interpreter.

use crate::filters::CodeExecutor;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use std::ffi::{CStr, CString};

/// Executes filter code in a fresh global scope and captures `sys.stdout`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonExecutor;

/// Puts the original `sys.stdout` back when dropped.
struct StdoutGuard<'py> {
    sys: Bound<'py, PyModule>,
    original: Bound<'py, PyAny>,
}

impl Drop for StdoutGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.sys.setattr("stdout", &self.original) {
            log::warn!("failed to restore sys.stdout: {}", err);
        }
    }
}

impl CodeExecutor for PythonExecutor {
    fn execute(&self, code: &str) -> Result<String, String> {
        let code = CString::new(code).map_err(|e| e.to_string())?;
        Python::attach(|py| run_captured(py, &code)).map_err(|e| e.to_string())
    }
}

fn run_captured(py: Python<'_>, code: &CStr) -> PyResult<String> {
    let sys = py.import("sys")?;
    let buffer = py.import("io")?.getattr("StringIO")?.call0()?;
    let guard = StdoutGuard {
        original: sys.getattr("stdout")?,
        sys,
    };
    guard.sys.setattr("stdout", &buffer)?;

    let globals = PyDict::new(py);
    py.run(code, Some(&globals), None)?;
    drop(guard);

    buffer.call_method0("getvalue")?.extract::<String>()
}
