//! Evaluation of a parsed rate expression against a marking and time.

use super::ast::{BinOp, CmpOp, Expr};

/// Evaluation context: the current logical time and a place-alias resolver.
pub struct Env<'a> {
    pub time: f64,
    pub place_tokens: &'a dyn Fn(&str) -> Option<f64>,
}

/// Evaluate `expr`, resolving `Var` names against `env`. Returns an error
/// string (never panics) on an unknown identifier, unknown function, wrong
/// arity, or a non-finite intermediate result.
pub fn eval(expr: &Expr, env: &Env) -> Result<f64, String> {
    let v = eval_inner(expr, env)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err("evaluation produced a non-finite value".to_string())
    }
}

fn eval_inner(expr: &Expr, env: &Env) -> Result<f64, String> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(name) => resolve_var(name, env),
        Expr::Neg(inner) => Ok(-eval_inner(inner, env)?),
        Expr::BinOp(op, a, b) => {
            let a = eval_inner(a, env)?;
            let b = eval_inner(b, env)?;
            Ok(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => {
                    if b == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    a / b
                }
                BinOp::Pow => a.powf(b),
            })
        }
        Expr::Compare(op, a, b) => {
            let a = eval_inner(a, env)?;
            let b = eval_inner(b, env)?;
            let result = match op {
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Eq => a == b,
                CmpOp::NotEq => a != b,
            };
            Ok(if result { 1.0 } else { 0.0 })
        }
        Expr::Conditional {
            then,
            cond,
            otherwise,
        } => {
            if eval_inner(cond, env)? != 0.0 {
                eval_inner(then, env)
            } else {
                eval_inner(otherwise, env)
            }
        }
        Expr::Call(name, args) => eval_call(name, args, env),
    }
}

fn resolve_var(name: &str, env: &Env) -> Result<f64, String> {
    match name {
        "time" => Ok(env.time),
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => (env.place_tokens)(name)
            .ok_or_else(|| format!("unknown identifier: {name}")),
    }
}

fn eval_call(name: &str, args: &[Expr], env: &Env) -> Result<f64, String> {
    let vals = args
        .iter()
        .map(|a| eval_inner(a, env))
        .collect::<Result<Vec<_>, _>>()?;
    let arity = |n: usize| -> Result<(), String> {
        if vals.len() != n {
            Err(format!(
                "{name} expects {n} argument(s), got {}",
                vals.len()
            ))
        } else {
            Ok(())
        }
    };
    match name {
        "exp" => {
            arity(1)?;
            Ok(vals[0].exp())
        }
        "log" => {
            arity(1)?;
            Ok(vals[0].ln())
        }
        "sin" => {
            arity(1)?;
            Ok(vals[0].sin())
        }
        "cos" => {
            arity(1)?;
            Ok(vals[0].cos())
        }
        "tan" => {
            arity(1)?;
            Ok(vals[0].tan())
        }
        "tanh" => {
            arity(1)?;
            Ok(vals[0].tanh())
        }
        "sinh" => {
            arity(1)?;
            Ok(vals[0].sinh())
        }
        "cosh" => {
            arity(1)?;
            Ok(vals[0].cosh())
        }
        "sqrt" => {
            arity(1)?;
            Ok(vals[0].sqrt())
        }
        "abs" => {
            arity(1)?;
            Ok(vals[0].abs())
        }
        "pow" => {
            arity(2)?;
            Ok(vals[0].powf(vals[1]))
        }
        "min" => {
            arity(2)?;
            Ok(vals[0].min(vals[1]))
        }
        "max" => {
            arity(2)?;
            Ok(vals[0].max(vals[1]))
        }
        other => Err(format!("unknown function: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_expr::parser::parse;

    fn eval_str(src: &str, time: f64, lookup: impl Fn(&str) -> Option<f64>) -> Result<f64, String> {
        let expr = parse(src).map_err(|e| e)?;
        let env = Env {
            time,
            place_tokens: &lookup,
        };
        eval(&expr, &env)
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(eval_str("2 + 3 * 4", 0.0, |_| None).unwrap(), 14.0);
    }

    #[test]
    fn evaluates_sigmoid_like_expression() {
        let v = eval_str("10/(1+exp(-0.5*(time-10)))", 10.0, |_| None).unwrap();
        assert!((v - 5.0).abs() < 1e-9);
    }

    #[test]
    fn resolves_place_alias() {
        let v = eval_str("P1 * 2", 0.0, |name| if name == "P1" { Some(3.0) } else { None })
            .unwrap();
        assert_eq!(v, 6.0);
    }

    #[test]
    fn conditional_selects_branch() {
        assert_eq!(eval_str("1 if 2 > 1 else 0", 0.0, |_| None).unwrap(), 1.0);
        assert_eq!(eval_str("1 if 0 > 1 else 0", 0.0, |_| None).unwrap(), 0.0);
    }

    #[test]
    fn rejects_unknown_identifier() {
        assert!(eval_str("Pmissing", 0.0, |_| None).is_err());
    }

    #[test]
    fn rejects_division_by_zero() {
        assert!(eval_str("1/0", 0.0, |_| None).is_err());
    }

    #[test]
    fn rejects_unknown_function() {
        assert!(eval_str("eval(1)", 0.0, |_| None).is_err());
    }
}
