use wasm_bindgen::prelude::*;

/// Paginate a JSON document, returning the rendered pages as JSON.
#[wasm_bindgen]
pub fn paginate(json: &str) -> Result<String, JsValue> {
    let pages = crate::paginate_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&pages).map_err(|e| JsValue::from_str(&format!("Failed to serialize pages: {e}")))
}

/// List the template variables of a JSON node tree.
#[wasm_bindgen(js_name = extractVariables)]
pub fn extract_variables(json: &str) -> Result<JsValue, JsValue> {
    let root: crate::Node =
        serde_json::from_str(json).map_err(|e| JsValue::from_str(&crate::PaginateError::from(e).to_string()))?;
    let variables = crate::extract_variables(&root);
    serde_wasm_bindgen::to_value(&variables).map_err(|e| js_sys::Error::new(&e.to_string()).into())
}
