//! Multimodal request builder.
//!
//! Turns a conversation window, the new prompt and an optional image into
//! the ordered message list for one completion call, and picks the model.
//! Pure: same inputs, same output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};
use relaybot_core::error::EncodingError;
use relaybot_core::message::{ConversationWindow, RequestMessage};
use relaybot_core::Role;

/// Model used for text-only requests.
pub const TEXT_MODEL: &str = "llama-3.3-70b-versatile";

/// Model used when the triggering turn carries an image.
pub const VISION_MODEL: &str = "llama-3.2-11b-vision-preview";

pub const DEFAULT_JPEG_QUALITY: u8 = 75;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Pick the model variant for the input modality.
pub fn select_model(has_image: bool) -> &'static str {
    if has_image { VISION_MODEL } else { TEXT_MODEL }
}

/// An image attached to the triggering turn.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Bytes in some container format (JPEG, PNG, ...).
    Encoded(Vec<u8>),
    /// An image already decoded in memory.
    Decoded(DynamicImage),
}

/// Output of [`RequestBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub messages: Vec<RequestMessage>,
    pub model: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    jpeg_quality: u8,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl RequestBuilder {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Build the message sequence: history first, oldest to newest, then the
    /// triggering message. Malformed history entries are dropped.
    pub fn build(
        &self,
        window: &ConversationWindow,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<BuiltRequest, EncodingError> {
        let mut messages: Vec<RequestMessage> = window
            .entries
            .iter()
            .filter_map(|entry| entry.well_formed())
            .map(|(role, content)| RequestMessage::text(role, content))
            .collect();

        let trigger = match image {
            Some(payload) => {
                let jpeg = to_jpeg(payload, self.jpeg_quality)?;
                RequestMessage::user_with_image(prompt, jpeg_data_uri(&jpeg))
            }
            None => RequestMessage::text(Role::User, prompt),
        };
        messages.push(trigger);

        Ok(BuiltRequest {
            messages,
            model: select_model(image.is_some()),
        })
    }
}

/// Normalize an image payload to JPEG bytes.
///
/// JPEG input passes through untouched; anything else is decoded and
/// re-encoded at `quality`.
pub fn to_jpeg(payload: &ImagePayload, quality: u8) -> Result<Vec<u8>, EncodingError> {
    match payload {
        ImagePayload::Encoded(bytes) if bytes.starts_with(&JPEG_MAGIC) => Ok(bytes.clone()),
        ImagePayload::Encoded(bytes) => {
            let decoded =
                image::load_from_memory(bytes).map_err(|e| EncodingError::Decode(e.to_string()))?;
            encode_jpeg(&decoded, quality)
        }
        ImagePayload::Decoded(image) => encode_jpeg(image, quality),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, EncodingError> {
    let rgb = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(flatten_on_white(image)).to_rgb8()
    } else {
        image.to_rgb8()
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(&DynamicImage::ImageRgb8(rgb))
        .map_err(|e| EncodingError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// JPEG has no alpha channel; composite transparent pixels onto white.
fn flatten_on_white(image: &DynamicImage) -> RgbaImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8 };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    flattened
}

/// Wrap JPEG bytes as a `data:` URI.
pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use relaybot_core::message::{HistoryEntry, MessageContent};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn history() -> ConversationWindow {
        ConversationWindow::from_entries(vec![
            HistoryEntry::new(Role::User, "hi"),
            HistoryEntry::new(Role::Assistant, "hello"),
        ])
    }

    #[test]
    fn model_selection() {
        assert_eq!(select_model(false), "llama-3.3-70b-versatile");
        assert_eq!(select_model(true), "llama-3.2-11b-vision-preview");
    }

    #[test]
    fn text_request_appends_prompt_after_history() {
        let built = RequestBuilder::default()
            .build(&history(), "how are you", None)
            .unwrap();

        assert_eq!(built.model, TEXT_MODEL);
        assert_eq!(
            built.messages,
            vec![
                RequestMessage::text(Role::User, "hi"),
                RequestMessage::text(Role::Assistant, "hello"),
                RequestMessage::text(Role::User, "how are you"),
            ]
        );
    }

    #[test]
    fn empty_history_yields_single_message() {
        let built = RequestBuilder::default()
            .build(&ConversationWindow::empty(), "first", None)
            .unwrap();
        assert_eq!(built.messages.len(), 1);
        assert_eq!(built.messages[0].text_content(), "first");
    }

    #[test]
    fn malformed_entries_are_dropped_and_neighbours_kept() {
        let window = ConversationWindow::from_entries(vec![
            HistoryEntry::new(Role::User, "one"),
            HistoryEntry { role: None, content: Some("orphan".into()) },
            HistoryEntry { role: Some(Role::Assistant), content: None },
            HistoryEntry::new(Role::Assistant, ""),
            HistoryEntry::new(Role::Assistant, "two"),
        ]);
        let built = RequestBuilder::default().build(&window, "three", None).unwrap();
        let texts: Vec<String> = built.messages.iter().map(|m| m.text_content()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn image_request_uses_vision_model_and_data_uri() {
        let payload = ImagePayload::Encoded(png_bytes());
        let built = RequestBuilder::default()
            .build(&history(), "what is this", Some(&payload))
            .unwrap();

        assert_eq!(built.model, VISION_MODEL);
        assert_eq!(built.messages.len(), 3);
        assert_eq!(built.messages[0], RequestMessage::text(Role::User, "hi"));
        assert_eq!(built.messages[1], RequestMessage::text(Role::Assistant, "hello"));

        let last = built.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.text_content(), "what is this");
        assert!(matches!(last.content, MessageContent::Parts(_)));
        assert!(last.image_url().unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn jpeg_passes_through_unchanged() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let out = to_jpeg(&ImagePayload::Encoded(jpeg.clone()), 75).unwrap();
        assert_eq!(out, jpeg);
    }

    #[test]
    fn png_is_reencoded_as_jpeg() {
        let out = to_jpeg(&ImagePayload::Encoded(png_bytes()), 75).unwrap();
        assert!(out.starts_with(&JPEG_MAGIC));
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn decoded_image_is_encoded() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 2, Rgb([200, 0, 0])));
        let out = to_jpeg(&ImagePayload::Decoded(img), 90).unwrap();
        assert!(out.starts_with(&JPEG_MAGIC));
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let err = RequestBuilder::default()
            .build(
                &ConversationWindow::empty(),
                "x",
                Some(&ImagePayload::Encoded(b"not an image".to_vec())),
            )
            .unwrap_err();
        assert!(matches!(err, EncodingError::Decode(_)));
    }

    #[test]
    fn data_uri_format() {
        assert_eq!(jpeg_data_uri(&[0xFF, 0xD8, 0xFF]), "data:image/jpeg;base64,/9j/");
    }
}
