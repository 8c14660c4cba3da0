#[cfg(all(feature = "python", not(target_arch = "wasm32")))]
use pyo3::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod ast;
mod compiler;
pub mod element;
mod error;
mod filters;
pub mod parser;
#[cfg(all(feature = "python", not(target_arch = "wasm32")))]
mod python;
pub mod tree;
mod types;

pub use compiler::{CompileOptions, Compiler};
pub use error::HamlError;
pub use filters::{CodeExecutor, Highlighter, PlainHighlighter};
#[cfg(all(feature = "python", not(target_arch = "wasm32")))]
pub use python::PythonExecutor;
pub use types::DirectiveRules;

/// Compiles a document with the default options, highlighter, and no code
/// execution.
pub fn compile(text: &str) -> Result<String, HamlError> {
    Compiler::new().compile(text)
}

#[cfg(all(feature = "python", not(target_arch = "wasm32")))]
#[pyfunction]
#[pyo3(signature = (text, options_json = None, execute_python = false))]
fn compile_text(
    text: String,
    options_json: Option<String>,
    execute_python: bool,
) -> PyResult<String> {
    let to_py_err = |e: HamlError| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string());
    let options = match options_json {
        Some(json) => CompileOptions::from_json(&json).map_err(to_py_err)?,
        None => CompileOptions::default(),
    };
    let mut compiler = Compiler::with_options(options);
    if execute_python {
        compiler = compiler.with_executor(PythonExecutor);
    }
    compiler.compile(&text).map_err(to_py_err)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn compile_text_wasm(text: &str) -> Result<String, JsValue> {
    compile(text).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn compile_text_with_options_wasm(text: &str, options_json: &str) -> Result<String, JsValue> {
    let options =
        CompileOptions::from_json(options_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Compiler::with_options(options)
        .compile(text)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(all(feature = "python", not(target_arch = "wasm32")))]
#[pymodule]
fn haml_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compile_text, m)?)?;
    Ok(())
}
