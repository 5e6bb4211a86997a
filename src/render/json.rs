use crate::Result;
use crate::plan::Plan;

/// Pretty-printed JSON, the machine-readable form of a plan.
pub fn render_json(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}
