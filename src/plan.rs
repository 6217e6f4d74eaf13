use alloc::{format, string::String, vec::Vec};
use tracing::{debug, warn};

use crate::{
    descriptor::{MethodInfo, Parameter},
    errors::ConfigErrorKind,
    value::{ArgumentPool, Value},
};

/// Where one argument of a call comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentSource {
    /// Service fetched by type; an optional one becomes `None` when unavailable
    FromService { ty: String, required: bool },
    /// Value supplied by the user
    FromLiteral(Value),
    /// Every service of a tag group, spread over a variadic parameter
    FromVariadicTag(String),
    /// Literal taken from the parameter declaration when the pool has nothing for it:
    /// its default value, or null for a nullable parameter without one. Emitters treat it
    /// like [`ArgumentSource::FromLiteral`].
    FromDefault(Value),
}

/// Ordered argument sources for one constructor or method call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterPlan {
    sources: Vec<ArgumentSource>,
}

impl ParameterPlan {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { sources: Vec::new() }
    }

    #[inline]
    #[must_use]
    pub fn sources(&self) -> &[ArgumentSource] {
        &self.sources
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ArgumentSource> {
        self.sources.iter()
    }

    #[inline]
    fn push(&mut self, source: ArgumentSource) {
        self.sources.push(source);
    }
}

impl<'a> IntoIterator for &'a ParameterPlan {
    type Item = &'a ArgumentSource;
    type IntoIter = core::slice::Iter<'a, ArgumentSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

/// Planned invocation of a method on a freshly built object (or statically on its type).
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub(crate) method: String,
    pub(crate) is_static: bool,
    pub(crate) plan: ParameterPlan,
}

impl MethodCall {
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    #[must_use]
    pub const fn plan(&self) -> &ParameterPlan {
        &self.plan
    }
}

/// Plans a call of `method` declared by `ty`.
///
/// # Errors
/// Returns [`ConfigErrorKind::NotPublic`] for a hidden method, otherwise see [`resolve_parameters`]
pub fn plan_method(ty: &str, method: &MethodInfo, pool: &mut ArgumentPool, max_depth: usize) -> Result<ParameterPlan, ConfigErrorKind> {
    let owner = format!("{ty}::{}", method.name());
    if !method.is_public() {
        return Err(ConfigErrorKind::NotPublic { owner });
    }
    resolve_parameters(&owner, method.parameters(), pool, max_depth)
}

/// Plans a constructor call. A missing or parameterless constructor needs no arguments.
///
/// # Errors
/// See [`plan_method`]
pub fn plan_constructor(ty: &str, constructor: Option<&MethodInfo>, pool: &mut ArgumentPool, max_depth: usize) -> Result<ParameterPlan, ConfigErrorKind> {
    match constructor {
        Some(constructor) if !constructor.parameters().is_empty() => plan_method(ty, constructor, pool, max_depth),
        _ => Ok(ParameterPlan::new()),
    }
}

/// Turns a signature and the user arguments for it into one source per parameter.
///
/// Class-typed parameters become service fetches (or a tag lookup named by the last user argument
/// when variadic). Other parameters take a user argument by name, or positionally while the
/// pending arguments start with a positional one; a variadic parameter takes everything left.
/// Then come the declared default, null for nullable parameters and nothing for a variadic one.
///
/// # Errors
/// - [`ConfigErrorKind::MissingParameter`] if a parameter can't be satisfied
/// - [`ConfigErrorKind::TagNotString`] if a variadic class parameter gets a non-string tag name
/// - [`ConfigErrorKind::TypeMismatch`] if a user argument doesn't match the declared scalar type
/// - [`ConfigErrorKind::TooDeep`] and [`ConfigErrorKind::UnsupportedLiteral`] for literals that can't be passed
pub fn resolve_parameters(owner: &str, parameters: &[Parameter], pool: &mut ArgumentPool, max_depth: usize) -> Result<ParameterPlan, ConfigErrorKind> {
    let mut plan = ParameterPlan::new();

    for parameter in parameters {
        if let Some(ty) = parameter.class_name() {
            plan.push(class_argument(owner, parameter, ty, pool)?);
            continue;
        }

        if !pool.is_empty() {
            if parameter.is_variadic() {
                for value in pool.drain() {
                    check_type(owner, parameter, &value)?;
                    match value {
                        Value::List(items) => {
                            for item in items {
                                plan.push(ArgumentSource::FromLiteral(literal(owner, parameter, item, 1, max_depth)?));
                            }
                        }
                        Value::Map(items) => {
                            for (_, item) in items {
                                plan.push(ArgumentSource::FromLiteral(literal(owner, parameter, item, 1, max_depth)?));
                            }
                        }
                        value => plan.push(ArgumentSource::FromLiteral(literal(owner, parameter, value, 0, max_depth)?)),
                    }
                }
                continue;
            }

            let value = match pool.take_named(parameter.name()) {
                Some(value) => Some(value),
                None if pool.front_is_positional() => pool.shift(),
                None => None,
            };
            if let Some(value) = value {
                check_type(owner, parameter, &value)?;
                plan.push(ArgumentSource::FromLiteral(literal(owner, parameter, value, 0, max_depth)?));
                continue;
            }
        }

        if let Some(default) = parameter.default() {
            plan.push(ArgumentSource::FromDefault(literal(owner, parameter, default.clone(), 0, max_depth)?));
        } else if parameter.is_nullable() {
            plan.push(ArgumentSource::FromDefault(Value::Null));
        } else if !parameter.is_variadic() {
            return Err(ConfigErrorKind::MissingParameter {
                parameter: parameter.name().into(),
                owner: owner.into(),
            });
        }
    }

    if !pool.is_empty() {
        warn!(owner, unused = pool.len(), "Arguments left unused");
    }
    debug!(owner, sources = plan.len(), "Parameters resolved");

    Ok(plan)
}

fn class_argument(owner: &str, parameter: &Parameter, ty: &str, pool: &mut ArgumentPool) -> Result<ArgumentSource, ConfigErrorKind> {
    if parameter.is_variadic() {
        if let Some(tag) = pool.pop_last() {
            return match tag {
                Value::String(tag) => Ok(ArgumentSource::FromVariadicTag(tag)),
                value => Err(ConfigErrorKind::TagNotString {
                    parameter: parameter.name().into(),
                    owner: owner.into(),
                    actual: value.kind(),
                }),
            };
        }
    }

    Ok(ArgumentSource::FromService {
        ty: ty.into(),
        required: !(parameter.default().is_some() || parameter.is_nullable()),
    })
}

fn check_type(owner: &str, parameter: &Parameter, value: &Value) -> Result<(), ConfigErrorKind> {
    let ty = parameter.ty();
    if ty.accepts(value.kind()) || (value.is_null() && parameter.is_nullable()) {
        return Ok(());
    }

    if parameter.is_variadic() {
        match value {
            Value::List(items) => return items.iter().try_for_each(|item| check_type(owner, parameter, item)),
            Value::Map(items) => return items.iter().try_for_each(|(_, item)| check_type(owner, parameter, item)),
            _ => {}
        }
    }

    Err(ConfigErrorKind::TypeMismatch {
        parameter: parameter.name().into(),
        owner: owner.into(),
        expected: ty.name().into(),
        actual: value.kind(),
    })
}

/// Validates a literal, descending into non-empty arrays until the `max_depth`-th level.
fn literal(owner: &str, parameter: &Parameter, value: Value, level: usize, max_depth: usize) -> Result<Value, ConfigErrorKind> {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => Ok(value),
        Value::List(ref items) if items.is_empty() => Ok(value),
        Value::Map(ref items) if items.is_empty() => Ok(value),
        Value::List(items) => {
            let level = nested(owner, parameter, level, max_depth)?;
            items
                .into_iter()
                .map(|item| literal(owner, parameter, item, level, max_depth))
                .collect::<Result<_, _>>()
                .map(Value::List)
        }
        Value::Map(items) => {
            let level = nested(owner, parameter, level, max_depth)?;
            items
                .into_iter()
                .map(|(key, item)| Ok((key, literal(owner, parameter, item, level, max_depth)?)))
                .collect::<Result<_, _>>()
                .map(Value::Map)
        }
        Value::Object(_) => Err(ConfigErrorKind::UnsupportedLiteral {
            parameter: parameter.name().into(),
            owner: owner.into(),
            actual: value.kind(),
        }),
    }
}

#[inline]
fn nested(owner: &str, parameter: &Parameter, level: usize, max_depth: usize) -> Result<usize, ConfigErrorKind> {
    let level = level + 1;
    if level >= max_depth {
        return Err(ConfigErrorKind::TooDeep {
            parameter: parameter.name().into(),
            owner: owner.into(),
        });
    }
    Ok(level)
}
