//! Bridge WASM <-> JavaScript cho màn hình xem trước khi tải bảng tính lên.

use intake_core::{ExtractionConfig, IntakeError};
use js_sys::{Array, Object, Reflect};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[derive(Deserialize)]
struct JsExtractionConfig {
    #[serde(default)]
    accept_address_spelling: Option<bool>,
}

impl From<JsExtractionConfig> for ExtractionConfig {
    fn from(cfg: JsExtractionConfig) -> Self {
        let mut base = ExtractionConfig::default();
        if let Some(accept) = cfg.accept_address_spelling {
            base.accept_address_spelling = accept;
        }
        base
    }
}

/// Trích xuất bảng tính dạng `{ rows: [[...], ...] }` hoặc mảng các hàng.
///
/// Mỗi ô là `null`, chuỗi, số, bool, `Date` của JS hoặc `{ date: "YYYY-MM-DD" }`.
/// `Date` được đổi sang ngày theo giờ địa phương; dạng khác bị ép thành văn bản.
#[wasm_bindgen]
pub fn extract_sheet(input_sheet: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let sheet_value = from_value::<serde_json::Value>(encode_js_dates(&input_sheet)?)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được bảng tính: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsExtractionConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            ExtractionConfig::from(cfg)
        }
        None => ExtractionConfig::default(),
    };

    let result = intake_sheet::extract_sheet_value(&sheet_value, &cfg)
        .map_err(|err| JsValue::from_str(&format_intake_error(err)))?;

    to_value(&result).map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

/// serde-wasm-bindgen biến `Date` thành `{}`; dựng bản sao các hàng với ô ngày
/// đã mã hóa, không sửa mảng của caller.
fn encode_js_dates(input_sheet: &JsValue) -> Result<JsValue, JsValue> {
    let rows = if Array::is_array(input_sheet) {
        input_sheet.clone()
    } else if input_sheet.is_object() {
        Reflect::get(input_sheet, &JsValue::from_str("rows"))?
    } else {
        return Ok(input_sheet.clone());
    };

    if !Array::is_array(&rows) {
        return Ok(input_sheet.clone());
    }

    let encoded = Array::new();
    for row in Array::from(&rows).iter() {
        if !Array::is_array(&row) {
            encoded.push(&row);
            continue;
        }
        let cells = Array::new();
        for cell in Array::from(&row).iter() {
            match cell.dyn_ref::<js_sys::Date>() {
                Some(date) => cells.push(&date_cell(date)?),
                None => cells.push(&cell),
            };
        }
        encoded.push(&cells);
    }
    Ok(encoded.into())
}

fn date_cell(date: &js_sys::Date) -> Result<JsValue, JsValue> {
    if date.get_time().is_nan() {
        return Ok(JsValue::NULL);
    }
    let cell = Object::new();
    let text = iso_date_text(date.get_full_year(), date.get_month(), date.get_date());
    Reflect::set(&cell, &JsValue::from_str("date"), &JsValue::from_str(&text))?;
    Ok(cell.into())
}

/// `month0` theo quy ước JS (0 = tháng 1).
fn iso_date_text(year: u32, month0: u32, day: u32) -> String {
    format!("{year:04}-{:02}-{day:02}", month0 + 1)
}

fn format_intake_error(err: IntakeError) -> String {
    format!("Intake error: {err}")
}
