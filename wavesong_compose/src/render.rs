// Handing a finished piece to something that turns it into bytes.
//
// Audio synthesis lives outside this crate; it plugs in through `Renderer`.
// The stock `JsonRenderer` dumps the full plan (sections, parts, notes) as
// JSON, which is what the `compose` binary writes with `--json`.

use crate::composer::Piece;
use crate::error::RenderError;
use std::path::Path;

pub trait Renderer {
    fn render(&self, piece: &Piece) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    fn render(&self, piece: &Piece) -> Result<Vec<u8>, RenderError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(piece)?
        } else {
            serde_json::to_vec(piece)?
        };
        Ok(bytes)
    }
}

/// Render and write to `path`.
pub fn write_rendered(renderer: &impl Renderer, piece: &Piece, path: &Path) -> Result<(), RenderError> {
    let bytes = renderer.render(piece)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
