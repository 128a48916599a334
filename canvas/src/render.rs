//! Rendering: draws the board to a 2D context.
//!
//! The only module that touches [`web_sys::CanvasRenderingContext2d`]. It reads
//! the engine's drawn positions and gesture phases and never mutates state.
//! Fallible canvas calls propagate as `Result<(), JsValue>` to
//! [`crate::host::BoardHost::tick`].

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::engine::EngineCore;
use crate::input::BlockPhase;

const BACKGROUND: &str = "#0f172a";
const BLOCK_FILL: &str = "#6366f1";
const BLOCK_FILL_OWNED: &str = "#818cf8";
const BLOCK_BORDER: &str = "#c7d2fe";
const LABEL_COLOR: &str = "#ffffff";
const LABEL_FONT: &str = "600 16px system-ui, sans-serif";

/// Draw every block at its display position for `now_ms`.
///
/// # Errors
///
/// Returns `Err` if a canvas call fails.
pub fn draw(ctx: &CanvasRenderingContext2d, engine: &EngineCore, now_ms: f64) -> Result<(), JsValue> {
    let vp = engine.viewport;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

    ctx.set_font(LABEL_FONT);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    for block in engine.doc.sorted_blocks() {
        let Some(at) = engine.display_position(&block.id, now_ms) else {
            continue;
        };
        let owned = engine.phase(&block.id) != BlockPhase::Idle;

        ctx.set_fill_style_str(if owned { BLOCK_FILL_OWNED } else { BLOCK_FILL });
        ctx.fill_rect(at.x, at.y, vp.block_width, vp.block_height);
        if owned {
            ctx.set_stroke_style_str(BLOCK_BORDER);
            ctx.set_line_width(2.0);
            ctx.stroke_rect(at.x, at.y, vp.block_width, vp.block_height);
        }

        ctx.set_fill_style_str(LABEL_COLOR);
        ctx.fill_text(&block.label, at.x + vp.block_width / 2.0, at.y + vp.block_height / 2.0)?;
    }
    Ok(())
}
