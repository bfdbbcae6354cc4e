//! System constants (C9): named providers consulted only when the variable store has no user
//! entry for the name (§3: "user wins" — the caller is responsible for checking the store
//! first, then falling back to `resolve_constant`).

use crate::value::Value;

/// Snapshot of the dynamic pieces of system state a constant lookup may need. Built fresh by
/// the VM on each access from whatever it currently knows (current inbound line, current
/// sector and current port class from the game-state collaborator).
pub struct SystemContext<'a> {
    pub current_line: &'a str,
    pub current_sector: i64,
    pub current_port: i64,
    pub version: &'static str,
    pub game: &'static str,
}

impl<'a> SystemContext<'a> {
    pub fn new(current_line: &'a str, current_sector: i64, current_port: i64) -> Self {
        SystemContext {
            current_line,
            current_sector,
            current_port,
            version: env!("CARGO_PKG_VERSION"),
            game: "TradeWars 2002",
        }
    }
}

/// Resolve a canonical (already-uppercased) constant name, or `None` if `name` is not a
/// system constant.
pub fn resolve_constant(name: &str, ctx: &SystemContext) -> Option<Value> {
    match name {
        "TRUE" => Some(Value::bool(true)),
        "FALSE" => Some(Value::bool(false)),
        "VERSION" => Some(Value::str(ctx.version)),
        "GAME" => Some(Value::str(ctx.game)),
        "CURRENTLINE" => Some(Value::str(ctx.current_line)),
        "CURRENTSECTOR" => Some(Value::number(ctx.current_sector as f64)),
        "PORT" => Some(Value::number(ctx.current_port as f64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_false_are_one_and_zero() {
        let ctx = SystemContext::new("", 0, 0);
        assert_eq!(resolve_constant("TRUE", &ctx), Some(Value::number(1.0)));
        assert_eq!(resolve_constant("FALSE", &ctx), Some(Value::number(0.0)));
    }

    #[test]
    fn current_line_reflects_context() {
        let ctx = SystemContext::new("Sector 123", 123, 0);
        assert_eq!(resolve_constant("CURRENTLINE", &ctx), Some(Value::str("Sector 123")));
        assert_eq!(resolve_constant("CURRENTSECTOR", &ctx), Some(Value::number(123.0)));
    }

    #[test]
    fn port_reflects_current_sectors_port_class() {
        let ctx = SystemContext::new("", 5, 3);
        assert_eq!(resolve_constant("PORT", &ctx), Some(Value::number(3.0)));
    }

    #[test]
    fn unknown_name_is_not_a_constant() {
        let ctx = SystemContext::new("", 0, 0);
        assert_eq!(resolve_constant("NOT_A_CONSTANT", &ctx), None);
    }
}
