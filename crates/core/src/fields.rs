//! Field bags attached to errors and log entries.

/// Key/value diagnostic fields. Values are restricted to what
/// [`serde_json::Value`] can represent, so everything that lands in a field
/// bag is serializable by construction.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Builds a [`FieldMap`] literal.
///
/// ```
/// use verdict_core::kv;
///
/// let fields = kv! { "url" => "/health", "attempt" => 3 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! kv {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut fields = $crate::fields::FieldMap::new();
        $( fields.insert(($key).to_string(), ::serde_json::json!($value)); )*
        fields
    }};
}
