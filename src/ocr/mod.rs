pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{TesseractRecognizer, TextRecognizer};
pub use extract::{extract_digits, ExtractSettings, RawDigits};
pub use setup::ensure_tesseract;
