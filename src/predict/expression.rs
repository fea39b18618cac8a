//! Expression evaluation against the active evaluation context.
//!
//! Backs the TRANSFORMED_VALUE and DECISION output features and derived
//! fields. Missing operands propagate as missing rather than failing, so a
//! transformed output over an absent input is itself absent.

use crate::context::EvaluationContext;
use crate::error::{EvalError, Result};
use crate::schema::Expression;
use crate::value::{coerce, DataType, OpType, TypedValue};

/// Evaluate an expression; `None` means the result is missing.
pub fn evaluate(
    expression: &Expression,
    ctx: &mut EvaluationContext<'_>,
) -> Result<Option<TypedValue>> {
    match expression {
        Expression::Constant { value, data_type } => constant(value, *data_type).map(Some),
        Expression::FieldRef(name) => field_ref(name, ctx),
        Expression::Apply { function, args } => apply(function, args, ctx),
    }
}

fn constant(value: &str, data_type: Option<DataType>) -> Result<TypedValue> {
    if let Some(data_type) = data_type {
        let op_type = if data_type.is_numeric() {
            OpType::Continuous
        } else {
            OpType::Categorical
        };
        return TypedValue::parse(op_type, data_type, value);
    }

    // Untyped constants: narrowest numeric reading wins, else a string.
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(TypedValue::integer(parsed));
    }
    if let Ok(parsed) = value.parse::<f64>() {
        return Ok(TypedValue::double(parsed));
    }
    Ok(TypedValue::string(value))
}

fn field_ref(name: &str, ctx: &mut EvaluationContext<'_>) -> Result<Option<TypedValue>> {
    if let Some(binding) = ctx.lookup(name) {
        return Ok(binding.cloned());
    }

    let Some(derived) = ctx.resolve_field(name) else {
        return Err(EvalError::MissingField(name.to_owned()));
    };

    let Some(value) = evaluate(&derived.expression, ctx)? else {
        return Ok(None);
    };

    let payload = coerce::cast(derived.decl.data_type, value.into_payload())?;
    Ok(Some(TypedValue::new(
        derived.decl.op_type,
        derived.decl.data_type,
        payload,
    )))
}

fn apply(
    function: &str,
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<Option<TypedValue>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match evaluate(arg, ctx)? {
            Some(value) => values.push(value),
            None => return Ok(None),
        }
    }

    if let Some(result) = builtin(function, &values)? {
        return Ok(Some(result));
    }

    let Some(definition) = ctx.resolve_function(function) else {
        return Err(EvalError::Evaluation(format!(
            "could not resolve function {function:?}"
        )));
    };

    if definition.parameters.len() != values.len() {
        return Err(EvalError::InvalidFeature(format!(
            "function {function:?} takes {} arguments, got {}",
            definition.parameters.len(),
            values.len()
        )));
    }

    let body = definition.body.clone();
    let parameters = definition.parameters.clone();

    let (result, _frame) = ctx.with_frame(|ctx| {
        for (parameter, value) in parameters.iter().zip(values) {
            let payload = coerce::cast(parameter.data_type, value.into_payload())?;
            ctx.bind(
                parameter.name.clone(),
                TypedValue::new(parameter.op_type, parameter.data_type, payload),
            );
        }
        evaluate(&body, ctx)
    })?;

    Ok(result)
}

fn builtin(function: &str, args: &[TypedValue]) -> Result<Option<TypedValue>> {
    let exact = |n: usize| -> Result<()> {
        if args.len() != n {
            return Err(EvalError::InvalidFeature(format!(
                "function {function:?} takes {n} arguments, got {}",
                args.len()
            )));
        }
        Ok(())
    };
    let number = |i: usize| args[i].as_number();

    let value = match function {
        "+" => {
            exact(2)?;
            number(0)? + number(1)?
        }
        "-" => {
            exact(2)?;
            number(0)? - number(1)?
        }
        "*" => {
            exact(2)?;
            number(0)? * number(1)?
        }
        "/" => {
            exact(2)?;
            number(0)? / number(1)?
        }
        "pow" => {
            exact(2)?;
            number(0)?.powf(number(1)?)
        }
        "abs" => {
            exact(1)?;
            number(0)?.abs()
        }
        "exp" => {
            exact(1)?;
            number(0)?.exp()
        }
        "ln" => {
            exact(1)?;
            number(0)?.ln()
        }
        "sqrt" => {
            exact(1)?;
            number(0)?.sqrt()
        }
        "min" => {
            exact(2)?;
            number(0)?.min(number(1)?)
        }
        "max" => {
            exact(2)?;
            number(0)?.max(number(1)?)
        }
        "if" => {
            if args.len() != 3 {
                return Err(EvalError::InvalidFeature(format!(
                    "function \"if\" takes 3 arguments, got {}",
                    args.len()
                )));
            }
            return Ok(Some(
                args[if args[0].as_boolean()? { 1 } else { 2 }].clone(),
            ));
        }
        _ => return Ok(None),
    };

    Ok(Some(TypedValue::double(value)))
}
