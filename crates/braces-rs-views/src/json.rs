//! JSON serialization of rendering contexts.
//!
//! [`JsonEncoder`] turns a [`Context`] into a `serde_json::Value`. The
//! JSON-native variants are handled by the trait itself; implementations only
//! decide how date-times, dates, times, durations and decimals are written.
//! [`IsoJsonEncoder`] writes them in ISO 8601 form.
//!
//! [`JsonResponder`] supplies content and mimetype for a
//! [`ContentResponder`](crate::responder::ContentResponder), and can produce
//! a response on its own through [`JsonResponder::render_json_response`].

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use braces_rs_core::settings::Settings;
use braces_rs_core::{BracesError, BracesResult, Context, ContextValue};
use braces_rs_http::{RequestContext, ResponseBody, ResponseEnvelope};

use crate::hooks::improperly_configured;
use crate::responder::{ContentProvider, DownloadContent};

/// The default JSON media type.
pub const JSON_MIMETYPE: &str = "application/json";

/// Converts context values to JSON.
pub trait JsonEncoder: Send + Sync {
    /// Encodes a value that has no native JSON form.
    ///
    /// Only called for `DateTime`, `Date`, `Time`, `Duration` and `Decimal`.
    fn encode_non_native(&self, value: &ContextValue) -> BracesResult<Value>;

    /// Encodes any value, recursing into lists and dicts.
    fn encode_value(&self, value: &ContextValue) -> BracesResult<Value> {
        Ok(match value {
            ContextValue::Null => Value::Null,
            ContextValue::Bool(b) => Value::Bool(*b),
            ContextValue::Integer(n) => Value::from(*n),
            ContextValue::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                BracesError::SerializationError(format!(
                    "Out of range float value {f} is not JSON compliant"
                ))
            })?,
            ContextValue::String(s) => Value::String(s.clone()),
            ContextValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.encode_value(item))
                    .collect::<BracesResult<_>>()?,
            ),
            ContextValue::Dict(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.encode_value(v)?)))
                    .collect::<BracesResult<Map<_, _>>>()?,
            ),
            other => self.encode_non_native(other)?,
        })
    }

    /// Encodes a whole context as a JSON object.
    fn encode_context(&self, context: &Context) -> BracesResult<Value> {
        context
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.encode_value(v)?)))
            .collect::<BracesResult<Map<_, _>>>()
            .map(Value::Object)
    }
}

/// Writes temporal values in ISO 8601 form and decimals as strings.
///
/// # Examples
///
/// ```
/// use braces_rs_core::ContextValue;
/// use braces_rs_views::json::{IsoJsonEncoder, JsonEncoder};
///
/// let date = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
/// let encoded = IsoJsonEncoder.encode_value(&ContextValue::Date(date)).unwrap();
/// assert_eq!(encoded, serde_json::json!("2024-02-29"));
///
/// let hours = ContextValue::Duration(chrono::Duration::minutes(90));
/// assert_eq!(IsoJsonEncoder.encode_value(&hours).unwrap(), serde_json::json!("P0DT01H30M00S"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoJsonEncoder;

impl IsoJsonEncoder {
    fn datetime(value: &DateTime<FixedOffset>) -> String {
        let mut out = value.format("%Y-%m-%dT%H:%M:%S").to_string();
        let micros = value.nanosecond() % 1_000_000_000 / 1_000;
        if micros != 0 {
            let _ = write!(out, ".{:03}", micros / 1_000);
        }
        let offset = value.format("%:z").to_string();
        if offset == "+00:00" {
            out.push('Z');
        } else {
            out.push_str(&offset);
        }
        out
    }

    fn time(value: &NaiveTime) -> String {
        let mut out = value.format("%H:%M:%S").to_string();
        let micros = value.nanosecond() % 1_000_000_000 / 1_000;
        if micros != 0 {
            let _ = write!(out, ".{:03}", micros / 1_000);
        }
        out
    }

    fn duration(value: &chrono::Duration) -> String {
        let negative = *value < chrono::Duration::zero();
        let value = if negative { -*value } else { *value };
        let total = value.num_seconds();
        let micros = value.subsec_nanos() / 1_000;
        let (days, rem) = (total / 86_400, total % 86_400);
        let (hours, rem) = (rem / 3_600, rem % 3_600);
        let (minutes, seconds) = (rem / 60, rem % 60);

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        let _ = write!(out, "P{days}DT{hours:02}H{minutes:02}M{seconds:02}");
        if micros != 0 {
            let _ = write!(out, ".{micros:06}");
        }
        out.push('S');
        out
    }
}

impl JsonEncoder for IsoJsonEncoder {
    fn encode_non_native(&self, value: &ContextValue) -> BracesResult<Value> {
        let text = match value {
            ContextValue::DateTime(dt) => Self::datetime(dt),
            ContextValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            ContextValue::Time(time) => Self::time(time),
            ContextValue::Duration(duration) => Self::duration(duration),
            ContextValue::Decimal(decimal) => decimal.clone(),
            other => {
                return Err(BracesError::SerializationError(format!(
                    "{other:?} is not JSON serializable"
                )))
            }
        };
        Ok(Value::String(text))
    }
}

// ── JsonResponder ───────────────────────────────────────────────────

/// Serializes contexts to JSON text.
#[derive(Clone)]
pub struct JsonResponder {
    indent: Option<usize>,
    encoder: Arc<dyn JsonEncoder>,
    mimetype: String,
    ensure_ascii: bool,
}

impl std::fmt::Debug for JsonResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonResponder")
            .field("indent", &self.indent)
            .field("mimetype", &self.mimetype)
            .field("ensure_ascii", &self.ensure_ascii)
            .finish_non_exhaustive()
    }
}

impl JsonResponder {
    /// Creates a new [`JsonResponderBuilder`].
    pub fn builder() -> JsonResponderBuilder {
        JsonResponderBuilder::default()
    }

    /// Returns the mimetype responses are sent with.
    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Encodes a context to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::SerializationError`] if the encoder rejects a
    /// value.
    pub fn encode_context(&self, context: &Context) -> BracesResult<String> {
        let value = self.encoder.encode_context(context)?;
        self.to_text(&value)
    }

    /// Produces a 200 response carrying the encoded context.
    pub fn render_json_response(&self, context: &Context) -> BracesResult<ResponseEnvelope> {
        let body = self.encode_context(context)?;
        self.response(body)
    }

    /// Serializes model objects as `[{"model", "pk", "fields"}]`.
    ///
    /// Each object must be a JSON object; its `pk` entry is lifted out and
    /// every other entry goes under `fields`.
    pub fn render_json_object_response(
        &self,
        model_label: &str,
        objects: &[Value],
    ) -> BracesResult<ResponseEnvelope> {
        let serialized = objects
            .iter()
            .map(|object| {
                let Value::Object(map) = object else {
                    return Err(BracesError::SerializationError(format!(
                        "{model_label} object is not a JSON object: {object}"
                    )));
                };
                let mut fields = map.clone();
                let pk = fields.remove("pk").unwrap_or(Value::Null);
                let mut entry = Map::new();
                entry.insert("model".to_string(), Value::String(model_label.to_string()));
                entry.insert("pk".to_string(), pk);
                entry.insert("fields".to_string(), Value::Object(fields));
                Ok(Value::Object(entry))
            })
            .collect::<BracesResult<Vec<_>>>()?;
        let body = self.to_text(&Value::Array(serialized))?;
        self.response(body)
    }

    fn response(&self, body: String) -> BracesResult<ResponseEnvelope> {
        let mut response = ResponseEnvelope::new(StatusCode::OK).with_body(ResponseBody::Text(body));
        response.set_header(CONTENT_TYPE, &self.mimetype)?;
        Ok(response)
    }

    fn to_text(&self, value: &Value) -> BracesResult<String> {
        let text = match self.indent {
            Some(width) if width > 0 => {
                let indent = " ".repeat(width);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut out = Vec::new();
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                value.serialize(&mut serializer)?;
                String::from_utf8(out)
                    .map_err(|e| BracesError::SerializationError(e.to_string()))?
            }
            _ => serde_json::to_string(value)?,
        };
        Ok(if self.ensure_ascii {
            escape_non_ascii(&text)
        } else {
            text
        })
    }
}

/// Escapes every non-ASCII character as `\uXXXX`, using surrogate pairs
/// outside the basic multilingual plane. Only valid on serialized JSON, where
/// such characters can only occur inside strings.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

#[async_trait]
impl ContentProvider for JsonResponder {
    async fn content(
        &self,
        _request: &RequestContext,
        context: &Context,
    ) -> BracesResult<DownloadContent> {
        self.encode_context(context).map(DownloadContent::Text)
    }
}

/// Builder for [`JsonResponder`].
pub struct JsonResponderBuilder {
    indent: Option<usize>,
    encoder: Arc<dyn JsonEncoder>,
    mimetype: String,
    ensure_ascii: bool,
}

impl Default for JsonResponderBuilder {
    fn default() -> Self {
        Self {
            indent: Settings::current().json_indent,
            encoder: Arc::new(IsoJsonEncoder),
            mimetype: JSON_MIMETYPE.to_string(),
            ensure_ascii: false,
        }
    }
}

impl JsonResponderBuilder {
    /// Sets the indentation width. Zero means compact output.
    #[must_use]
    pub const fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    /// Replaces the encoder for non-native values.
    #[must_use]
    pub fn encoder(mut self, encoder: impl JsonEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Overrides the mimetype.
    #[must_use]
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = mimetype.into();
        self
    }

    /// Escapes non-ASCII characters in the output.
    #[must_use]
    pub const fn ensure_ascii(mut self, ensure_ascii: bool) -> Self {
        self.ensure_ascii = ensure_ascii;
        self
    }

    /// Builds the responder.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if the mimetype is not a
    /// valid media type.
    pub fn build(self) -> BracesResult<JsonResponder> {
        if self.mimetype.parse::<mime::Mime>().is_err() {
            return Err(improperly_configured(
                "JsonResponder",
                format!("'{}' is not a valid mimetype", self.mimetype),
            ));
        }
        Ok(JsonResponder {
            indent: self.indent,
            encoder: self.encoder,
            mimetype: self.mimetype,
            ensure_ascii: self.ensure_ascii,
        })
    }
}
