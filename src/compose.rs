//! Preview composer
//!
//! Builds the single self-contained document handed to the render surface.
//! Buffers are embedded verbatim: the render surface's sandbox is the
//! security boundary, not this function.

use crate::CodeState;

/// Prefix of the diagnostic the script error boundary emits
pub const ERROR_BOUNDARY_LABEL: &str = "JS Error:";

/// Script-closing tail of the composed document: the boundary's catch block
pub(crate) const BOUNDARY_CATCH: &str =
    "\n      } catch (e) {\n        console.error(\"JS Error:\", e);\n      }\n    ";

const HEAD: &str = "<!DOCTYPE html>
<html lang=\"en\">
  <head>
    <meta charset=\"UTF-8\">
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
    <style>";

const AFTER_STYLE: &str = "</style>
  </head>
  <body>
";

const SCRIPT_OPEN: &str = "
    <script>
      try {
";

/// Compose the preview document from the three buffers.
///
/// Pure: identical state always yields a byte-identical document.
pub fn compose(state: &CodeState) -> String {
    let mut doc = String::with_capacity(
        HEAD.len() + state.css.len() + state.html.len() + state.js.len() + 256,
    );
    doc.push_str(HEAD);
    doc.push_str(&state.css);
    doc.push_str(AFTER_STYLE);
    doc.push_str(&state.html);
    doc.push_str(SCRIPT_OPEN);
    doc.push_str(&state.js);
    doc.push_str(BOUNDARY_CATCH);
    doc.push_str("</script>\n  </body>\n</html>\n");
    doc
}
