use standin_engine::StdResult;
use standin_engine::entities::{FutureValue, ThrownError, Value};
use standin_engine::module_registry::{Module, ModuleRegistry};
use standin_engine::test_tools::TestLogger;

pub const TOOLS: &str = "tools";
pub const HTTP: &str = "http";

fn operands(operation: &str, args: &[Value]) -> Result<(f64, f64), ThrownError> {
    match args {
        [left, right, ..] => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(ThrownError::with_kind(
                "TypeError",
                format!("{operation} expects two numbers"),
            )),
        },
        _ => Err(ThrownError::with_kind(
            "TypeError",
            format!("{operation} expects two numbers"),
        )),
    }
}

/// Genuine arithmetic module: `sum`, `sub`, `mul` and `div`, the latter throwing on zero.
pub fn tools_module() -> StdResult<Module> {
    Ok(Module::new(TOOLS)
        .with_function("sum", |args| {
            operands("sum", args).map(|(left, right)| Value::from(left + right))
        })
        .with_function("sub", |args| {
            operands("sub", args).map(|(left, right)| Value::from(left - right))
        })
        .with_function("mul", |args| {
            operands("mul", args).map(|(left, right)| Value::from(left * right))
        })
        .with_function("div", |args| {
            let (left, right) = operands("div", args)?;
            if right == 0.0 {
                return Err(ThrownError::with_kind("RangeError", "Division by zero"));
            }
            Ok(Value::from(left / right))
        }))
}

/// Genuine http module, every request fails as no network is reachable from tests.
pub fn http_module() -> StdResult<Module> {
    Ok(Module::new(HTTP).with_function("get", |args| {
        let url = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(Value::Future(FutureValue::rejected(ThrownError::with_kind(
            "NetworkError",
            format!("Network unreachable: {url}"),
        ))))
    }))
}

/// Registry with the `tools` and `http` modules declared
pub fn registry() -> ModuleRegistry {
    let registry = ModuleRegistry::new(&TestLogger::stdout());
    registry.declare(TOOLS, tools_module).unwrap();
    registry.declare(HTTP, http_module).unwrap();

    registry
}

/// Map value from key/value pairs
pub fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::map(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value)),
    )
}
