// PDF export: decrypts client-sealed resume HTML and prints it with headless Chromium.
// The browser is only reached through the PdfRenderer trait.

pub mod crypto;
pub mod handlers;
pub mod models;
pub mod renderer;
