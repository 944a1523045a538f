//! Decode-time dispatch decisions.
//!
//! At every value boundary the deserializer asks [`decide`] what to do with
//! the value starting there: hand its bytes to a keyed decoder, expand a call
//! expression into its reserved-key object, or decode it as plain JSON. The
//! decision depends only on the scanned site, the registry and the
//! destination's [`Shape`].

use crate::{
    Error, Result, Value,
    extension::{Extension, FunctionSpec},
    scanner::{ScanIndex, Site, SiteKind, Span, unescape},
};

/// What a destination asked the deserializer for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Self-describing destination; takes whatever the input holds.
    Any,
    Ignored,
    Bool,
    Number,
    String,
    Bytes,
    Unit,
    Seq,
    Map,
    Enum,
    /// Raw-capture destination.
    Raw,
}

impl Shape {
    /// Whether a keyed decoder's result can be stored here.
    pub(crate) fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Any | Shape::Raw => true,
            Shape::Ignored => false,
            Shape::Bool => matches!(value, Value::Bool(_)),
            Shape::Number => matches!(value, Value::Number(_)),
            Shape::String => matches!(value, Value::String(_)),
            Shape::Bytes => matches!(value, Value::String(_) | Value::Array(_)),
            Shape::Unit => value.is_null(),
            Shape::Seq => matches!(value, Value::Array(_)),
            Shape::Map => matches!(value, Value::Object(_)),
            Shape::Enum => matches!(value, Value::String(_)) || value.single_key().is_some(),
        }
    }
}

/// A call expression whose function is registered.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Call<'de, 'e> {
    pub(crate) name: &'de str,
    pub(crate) spec: &'e FunctionSpec,
    pub(crate) span: Span,
    pub(crate) args: usize,
}

impl Call<'_, '_> {
    /// Offset just past the opening parenthesis.
    pub(crate) fn args_start(&self) -> usize {
        self.span.start + self.name.len() + 1
    }
}

pub(crate) enum Decision<'de, 'e> {
    /// A keyed decoder produced the value; resume after `end`.
    Keyed { value: Value, end: usize },
    /// Decode the call as `{reserved_key: {param: arg, ..}}`.
    Expand(Call<'de, 'e>),
    Baseline,
}

enum Candidate<'de, 'e> {
    Call(Call<'de, 'e>),
    Key(std::borrow::Cow<'de, str>),
}

fn resolve_call<'de, 'e>(
    input: &'de str,
    site: &Site,
    ext: &'e Extension,
) -> Result<Option<Call<'de, 'e>>> {
    let SiteKind::Call { name, args } = site.kind else {
        return Ok(None);
    };
    let name = &input[name.range()];
    let spec = ext
        .function(name)
        .ok_or_else(|| Error::UnknownFunction(name.to_owned()))?;
    Ok(Some(Call {
        name,
        spec,
        span: site.span,
        args,
    }))
}

fn candidate<'de, 'e>(
    input: &'de str,
    site: &Site,
    ext: &'e Extension,
) -> Result<Option<Candidate<'de, 'e>>> {
    match site.kind {
        SiteKind::Call { .. } => Ok(resolve_call(input, site, ext)?.map(Candidate::Call)),
        SiteKind::Object {
            members: 1,
            first_key: Some(key),
        } => Ok(Some(Candidate::Key(unescape(&input[key.range()], key.start)?))),
        _ => Ok(None),
    }
}

/// Decide how to decode the value recorded at `site` into `shape`.
///
/// Keyed decoders run speculatively: the hook is called and its result is
/// kept only if `shape` accepts it. Hook errors propagate either way. Calls
/// inside the hooked span are checked against the registry first.
pub(crate) fn decide<'de, 'e>(
    input: &'de str,
    index: &ScanIndex,
    site: Option<&Site>,
    ext: &'e Extension,
    shape: Shape,
) -> Result<Decision<'de, 'e>> {
    let Some(site) = site else {
        return Ok(Decision::Baseline);
    };
    let Some(candidate) = candidate(input, site, ext)? else {
        return Ok(Decision::Baseline);
    };
    let key = match &candidate {
        Candidate::Call(call) => call.spec.reserved_key(),
        Candidate::Key(key) => key.as_ref(),
    };

    if shape != Shape::Ignored
        && let Some(hook) = ext.keyed_decoder(key)
    {
        check_calls(input, index, site.span, ext)?;
        let value = hook(input[site.span.range()].as_bytes()).map_err(Error::Hook)?;
        if shape.accepts(&value) {
            log::trace!(
                "keyed decoder {key} intercepted {:?} at {}",
                shape,
                site.span.start
            );
            return Ok(Decision::Keyed {
                value,
                end: site.span.end,
            });
        }
        log::trace!(
            "keyed decoder {key} declined: {:?} does not accept {}",
            shape,
            value.kind()
        );
    }

    match candidate {
        Candidate::Call(call) if call.args > call.spec.arity() => {
            Err(Error::TooManyArguments(call.name.to_owned()))
        }
        Candidate::Call(call) => {
            log::trace!("expanding {} at {}", call.name, call.span.start);
            Ok(Decision::Expand(call))
        }
        Candidate::Key(_) => Ok(Decision::Baseline),
    }
}

/// Check every call expression inside `span` against the registry without
/// decoding anything. Used where a value is captured verbatim or skipped.
pub(crate) fn check_calls(input: &str, index: &ScanIndex, span: Span, ext: &Extension) -> Result<()> {
    for site in index.within(span) {
        if let Some(call) = resolve_call(input, site, ext)?
            && call.args > call.spec.arity()
        {
            return Err(Error::TooManyArguments(call.name.to_owned()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn registry() -> Extension {
        let mut ext = Extension::new();
        ext.register_function("Func2", "$func2", &["arg1", "arg2"])
            .register_keyed_decoder("$key1", |raw: &[u8]| {
                Ok(Value::String(String::from_utf8(raw.to_vec())?))
            });
        ext
    }

    #[test]
    fn shape_acceptance() {
        let text = Value::from("x");
        assert!(Shape::Any.accepts(&text));
        assert!(Shape::String.accepts(&text));
        assert!(Shape::Enum.accepts(&text));
        assert!(!Shape::Number.accepts(&text));
        assert!(!Shape::Map.accepts(&text));
        assert!(Shape::Unit.accepts(&Value::Null));
    }

    #[test]
    fn keyed_object_is_intercepted() {
        let ext = registry();
        let input = r#"{"$key1": 1}"#;
        let index = scan(input.as_bytes()).unwrap();
        match decide(input, &index, index.root(), &ext, Shape::Any).unwrap() {
            Decision::Keyed { value, end } => {
                assert_eq!(value, Value::from(input));
                assert_eq!(end, input.len());
            }
            _ => panic!("expected keyed decision"),
        }
    }

    #[test]
    fn keyed_result_declined_by_number() {
        let ext = registry();
        let input = r#"{"$key1": 1}"#;
        let index = scan(input.as_bytes()).unwrap();
        assert!(matches!(
            decide(input, &index, index.root(), &ext, Shape::Number).unwrap(),
            Decision::Baseline
        ));
    }

    #[test]
    fn call_expands() {
        let ext = registry();
        let input = "Func2(1)";
        let index = scan(input.as_bytes()).unwrap();
        match decide(input, &index, index.root(), &ext, Shape::Any).unwrap() {
            Decision::Expand(call) => {
                assert_eq!(call.name, "Func2");
                assert_eq!(call.args, 1);
                assert_eq!(call.args_start(), 6);
            }
            _ => panic!("expected expansion"),
        }
    }

    #[test]
    fn keyed_span_is_checked_before_the_hook() {
        let mut ext = registry();
        ext.register_keyed_decoder("$func2", |_: &[u8]| Ok(Value::Null));
        for (input, error) in [
            (r#"{"$key1": Nope()}"#, "Nope"),
            ("Func2(1, 2, 3)", "Func2"),
        ] {
            let index = scan(input.as_bytes()).unwrap();
            match decide(input, &index, index.root(), &ext, Shape::Any) {
                Err(Error::UnknownFunction(name) | Error::TooManyArguments(name)) => {
                    assert_eq!(name, error)
                }
                _ => panic!("{input}: expected a call error"),
            }
        }
    }

    #[test]
    fn nested_unknown_call_is_found() {
        let ext = registry();
        let input = "[1, {\"a\": Nope()}]";
        let index = scan(input.as_bytes()).unwrap();
        let root = *index.root().unwrap();
        assert!(matches!(
            check_calls(input, &index, root.span, &ext),
            Err(Error::UnknownFunction(name)) if name == "Nope"
        ));
    }
}
