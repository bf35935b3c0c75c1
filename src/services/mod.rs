// Vendor and purchase order stores
pub mod purchase_orders;
pub mod vendors;

// Metrics recalculation shared by the stores
pub mod performance;

use sea_orm::sea_query::LikeExpr;
use validator::ValidationError;

const LIKE_ESCAPE: char = '\\';

/// Case-folded `%term%` pattern with `%`, `_` and the escape char taken literally
pub(crate) fn contains_pattern(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

/// Rejects strings that are empty after trimming
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
