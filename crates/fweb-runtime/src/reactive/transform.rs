#![forbid(unsafe_code)]

//! Value transforms applied while crossing a link.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("cannot convert value for `{attr}`: {source}")]
    Conversion {
        attr: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("transform failed: {message}")]
    Transform { message: String },

    #[error("attribute `{attr}` is not bindable")]
    UnknownAttribute { attr: String },

    #[error(transparent)]
    Endpoint(#[from] fweb_core::Error),
}

impl BindingError {
    #[must_use]
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }
}

type TransformFn = dyn Fn(&Value) -> Result<Value, BindingError>;

/// One-argument function applied to a value before it is written to the
/// destination of a link.
///
/// Transforms may run any number of times per pass; they must not depend on
/// being called in a particular order.
#[derive(Clone)]
pub struct Transform(Rc<TransformFn>);

impl Transform {
    /// Infallible transform over raw JSON values.
    pub fn new(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Self(Rc::new(move |value| Ok(f(value))))
    }

    pub fn fallible(f: impl Fn(&Value) -> Result<Value, BindingError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Transform between concrete types, converting through serde.
    ///
    /// ```
    /// use fweb_runtime::reactive::Transform;
    /// use serde_json::json;
    ///
    /// let double = Transform::typed(|n: i64| n * 2);
    /// assert_eq!(double.apply(&json!(21)).unwrap(), json!(42));
    /// assert!(double.apply(&json!("x")).is_err());
    /// ```
    pub fn typed<A, B>(f: impl Fn(A) -> B + 'static) -> Self
    where
        A: DeserializeOwned,
        B: Serialize,
    {
        Self(Rc::new(move |value| {
            let input = A::deserialize(value).map_err(|source| BindingError::Conversion {
                attr: "<transform input>".to_string(),
                source,
            })?;
            serde_json::to_value(f(input)).map_err(|source| BindingError::Conversion {
                attr: "<transform output>".to_string(),
                source,
            })
        }))
    }

    pub fn apply(&self, value: &Value) -> Result<Value, BindingError> {
        (self.0)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_transform_reports_type_mismatch() {
        let t = Transform::typed(|s: String| s.len());
        assert_eq!(t.apply(&json!("abc")).unwrap(), json!(3));
        let err = t.apply(&json!(5)).unwrap_err();
        assert!(matches!(err, BindingError::Conversion { .. }));
    }

    #[test]
    fn fallible_transform_passes_error_through() {
        let t = Transform::fallible(|v| {
            v.as_f64()
                .filter(|n| *n != 0.0)
                .map(|n| json!(1.0 / n))
                .ok_or_else(|| BindingError::transform("division by zero"))
        });
        assert_eq!(t.apply(&json!(4.0)).unwrap(), json!(0.25));
        assert!(t.apply(&json!(0.0)).unwrap_err().to_string().contains("division by zero"));
    }
}
