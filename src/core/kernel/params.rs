use crate::core::errors::ExchangeError;
use crate::core::types::QueryOrder;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered, mutable request parameters with unique keys
///
/// Adapters inject venue-required fields (timestamp, recv window, ...)
/// before the request is signed. Values are converted to JSON on insert, so
/// anything that cannot be serialized is rejected up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    inner: Map<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`. Overwriting keeps the original position.
    pub fn insert<V: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: V,
    ) -> Result<&mut Self, ExchangeError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| {
            ExchangeError::EncodingError(format!("Parameter '{}' is not serializable: {}", key, e))
        })?;
        self.inner.insert(key, value);
        Ok(self)
    }

    /// Builder-style insert
    pub fn with<V: Serialize>(
        mut self,
        key: impl Into<String>,
        value: V,
    ) -> Result<Self, ExchangeError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Percent-encoded `k=v&k=v` in the requested order
    ///
    /// Nulls are skipped. Arrays and objects have no canonical query form and
    /// fail with `EncodingError`.
    pub fn to_query(&self, order: QueryOrder) -> Result<String, ExchangeError> {
        let mut pairs: Vec<(&str, String)> = Vec::with_capacity(self.inner.len());
        for (key, value) in &self.inner {
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ExchangeError::EncodingError(format!(
                        "Parameter '{}' cannot be encoded into a query string",
                        key
                    )))
                }
            };
            pairs.push((key.as_str(), rendered));
        }

        if order == QueryOrder::Lexicographic {
            pairs.sort_by(|a, b| a.0.cmp(b.0));
        }

        serde_urlencoded::to_string(&pairs)
            .map_err(|e| ExchangeError::EncodingError(format!("Failed to encode query: {}", e)))
    }

    /// JSON object body in insertion order
    pub fn to_json_body(&self) -> Result<Vec<u8>, ExchangeError> {
        serde_json::to_vec(&self.inner).map_err(|e| {
            ExchangeError::EncodingError(format!("Failed to serialize request body: {}", e))
        })
    }
}

impl From<Map<String, Value>> for Params {
    fn from(inner: Map<String, Value>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn order_params() -> Params {
        Params::new()
            .with("symbol", "BTCUSDT")
            .unwrap()
            .with("side", "BUY")
            .unwrap()
            .with("quantity", 1)
            .unwrap()
            .with("price", 0.1)
            .unwrap()
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let query = order_params().to_query(QueryOrder::Insertion).unwrap();
        assert_eq!(query, "symbol=BTCUSDT&side=BUY&quantity=1&price=0.1");
    }

    #[test]
    fn test_lexicographic_order() {
        let query = order_params().to_query(QueryOrder::Lexicographic).unwrap();
        assert_eq!(query, "price=0.1&quantity=1&side=BUY&symbol=BTCUSDT");
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let params = order_params();
        for order in [QueryOrder::Insertion, QueryOrder::Lexicographic] {
            assert_eq!(
                params.to_query(order).unwrap(),
                params.to_query(order).unwrap()
            );
        }
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut params = order_params();
        params.insert("symbol", "ETHUSDT").unwrap();
        assert_eq!(params.len(), 4);
        assert!(params
            .to_query(QueryOrder::Insertion)
            .unwrap()
            .starts_with("symbol=ETHUSDT&"));
    }

    #[test]
    fn test_percent_encoding() {
        let params = Params::new()
            .with("note", "a b&c=d")
            .unwrap()
            .with("path", "/x")
            .unwrap();
        assert_eq!(
            params.to_query(QueryOrder::Insertion).unwrap(),
            "note=a+b%26c%3Dd&path=%2Fx"
        );
    }

    #[test]
    fn test_nested_value_is_an_encoding_error() {
        let params = Params::new().with("ids", vec![1, 2, 3]).unwrap();
        let err = params.to_query(QueryOrder::Insertion).unwrap_err();
        assert!(matches!(err, ExchangeError::EncodingError(_)));
        // but it is fine in a JSON body
        assert_eq!(params.to_json_body().unwrap(), br#"{"ids":[1,2,3]}"#.to_vec());
    }

    #[test]
    fn test_unserializable_value_is_rejected() {
        // JSON object keys must be strings
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");
        let err = Params::new().insert("bad", bad).unwrap_err();
        assert!(matches!(err, ExchangeError::EncodingError(_)));
    }

    #[test]
    fn test_null_is_skipped() {
        let params = Params::new()
            .with("a", 1)
            .unwrap()
            .with("b", Option::<String>::None)
            .unwrap();
        assert_eq!(params.to_query(QueryOrder::Insertion).unwrap(), "a=1");
    }
}
