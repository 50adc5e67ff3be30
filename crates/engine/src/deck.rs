//! The deck accumulator: progress reporting and slide collection.
//!
//! Analysis units go through these functions rather than printing or touching the
//! slide list directly, so progress surfacing and duplicate-id handling live in one
//! place.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use core_types::{DEFAULT_CATEGORY, SlideEntry, SlideIdPolicy};
use serde_json::{Map, Value};

/// Logs `message` and forwards it to the context's progress sink, if one is registered.
pub fn report(ctx: &PipelineContext, message: &str) {
    tracing::info!(client = %ctx.client_id, "{}", message);
    if let Some(callback) = ctx.progress_callback() {
        callback(message);
    }
}

/// Appends a slide in the `"General"` category.
pub fn add_slide(
    ctx: &mut PipelineContext,
    id: impl Into<String>,
    data: Map<String, Value>,
) -> Result<(), PipelineError> {
    add_slide_with_category(ctx, id, DEFAULT_CATEGORY, data)
}

/// Appends a slide with `include = true`, tagged with the context's current pass.
///
/// Entries with the same id from an earlier pass are marked `include = false`.
/// A reused id within the current pass is handled according to `ctx.slide_policy`:
/// rejected with an `Output` error, accepted after excluding the earlier entries, or
/// accepted as is.
pub fn add_slide_with_category(
    ctx: &mut PipelineContext,
    id: impl Into<String>,
    category: impl Into<String>,
    data: Map<String, Value>,
) -> Result<(), PipelineError> {
    let id = id.into();
    let pass = ctx.slide_pass();
    let duplicate = ctx.all_slides.iter().any(|s| s.id == id && s.pass == pass);

    if duplicate {
        match ctx.slide_policy {
            SlideIdPolicy::Reject => {
                return Err(
                    PipelineError::output(format!("Slide id '{id}' was already added in this run"))
                        .with_detail("slide_id", id),
                );
            }
            SlideIdPolicy::LastWins => {
                tracing::debug!(slide_id = %id, "Superseding earlier slide entry.");
                for earlier in ctx.all_slides.iter_mut().filter(|s| s.id == id) {
                    earlier.include = false;
                }
            }
            SlideIdPolicy::AllowDuplicates => {
                tracing::warn!(slide_id = %id, "Duplicate slide id accepted.");
            }
        }
    }

    for stale in ctx
        .all_slides
        .iter_mut()
        .filter(|s| s.id == id && s.pass < pass && s.include)
    {
        tracing::debug!(slide_id = %id, from_pass = stale.pass, "Slide replaced by a later run.");
        stale.include = false;
    }

    ctx.all_slides.push(SlideEntry::new(id, category, data).with_pass(pass));
    Ok(())
}

/// Marks every entry with `id` as excluded from the deck. Returns how many were changed.
///
/// The entries stay in the history; output builders skip them.
pub fn exclude_slide(ctx: &mut PipelineContext, id: &str) -> usize {
    let mut changed = 0;
    for slide in ctx.all_slides.iter_mut().filter(|s| s.id == id && s.include) {
        slide.include = false;
        changed += 1;
    }
    changed
}
