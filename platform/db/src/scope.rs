//! ScopeFilter → `sea_query` predicate translation.

use platform_access::{AccessRule, ScopeFilter};
use sea_orm::sea_query::{Alias, Condition, Expr, SimpleExpr};

/// Column names the predicate should be built against. The same filter is
/// applied to different tables (devices, IMEIs, search history), so callers
/// name the columns per query.
#[derive(Clone, Copy, Debug)]
pub struct ScopeColumns {
    pub owner: &'static str,
    pub brand: &'static str,
    pub organization: &'static str,
    /// Column holding the identifier that range rules classify.
    pub identifier: &'static str,
}

/// Build a WHERE condition for a scope filter.
///
/// `ScopeFilter::None` renders an always-false predicate; `All` renders no
/// narrowing. Range-rule lists translate to a disjunction; membership is
/// what matters for filtering, so the first-match-wins ordering used by the
/// decision engine has no analogue here.
pub fn scope_condition(filter: &ScopeFilter, columns: &ScopeColumns) -> Condition {
    match filter {
        ScopeFilter::None => always_false(),
        ScopeFilter::Own { owner_id } => {
            Condition::all().add(Expr::col(Alias::new(columns.owner)).eq(*owner_id))
        }
        ScopeFilter::Organization { organization } => Condition::all()
            .add(Expr::col(Alias::new(columns.organization)).eq(organization.as_str())),
        ScopeFilter::Brands { brands } => Condition::all().add(
            Expr::col(Alias::new(columns.brand)).is_in(brands.iter().map(String::as_str)),
        ),
        ScopeFilter::Ranges { rules } => {
            let mut any = Condition::any();
            let mut translated = 0usize;
            for rule in rules {
                if let Some(expr) = rule_expr(rule, columns.identifier) {
                    any = any.add(expr);
                    translated += 1;
                }
            }
            if translated == 0 {
                // Nothing translatable must mean nothing visible.
                always_false()
            } else {
                any
            }
        }
        ScopeFilter::All => Condition::all(),
    }
}

fn rule_expr(rule: &AccessRule, identifier: &'static str) -> Option<SimpleExpr> {
    match rule {
        AccessRule::Prefix { prefix } => Some(
            Expr::col(Alias::new(identifier)).like(format!("{}%", escape_like(prefix))),
        ),
        AccessRule::Range { start, end } => Some(
            Expr::col(Alias::new(identifier)).between(start.as_str(), end.as_str()),
        ),
        AccessRule::Exact { imeis } => Some(
            Expr::col(Alias::new(identifier)).is_in(imeis.iter().map(String::as_str)),
        ),
        // Postgres `~` is unanchored; mirror the matcher's position-0 anchor.
        AccessRule::Regex { pattern } => Some(Expr::cust_with_values(
            format!("{identifier} ~ ?"),
            [format!("^(?:{pattern})")],
        )),
    }
}

fn always_false() -> Condition {
    Condition::all().add(Expr::value(false))
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
