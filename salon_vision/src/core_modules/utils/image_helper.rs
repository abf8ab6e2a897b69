pub mod image_helper {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use image::codecs::png::PngEncoder;
    use image::error::{ImageError, ParameterError, ParameterErrorKind};
    use image::ImageEncoder;
    use std::path::Path;

    const RGBA_CHANNELS: usize = 4;

    fn check_len(width: u32, height: u32, buffer: &[u8]) -> Result<(), ImageError> {
        if buffer.len() != width as usize * height as usize * RGBA_CHANNELS {
            return Err(ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            )));
        }
        Ok(())
    }

    /// Writes a raw RGBA buffer to `path` as a PNG.
    pub fn save(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        buffer: &[u8],
    ) -> Result<(), ImageError> {
        check_len(width, height, buffer)?;
        let output = std::fs::File::create(path)?;
        let encoder = PngEncoder::new(output);

        encoder.write_image(buffer, width, height, image::ExtendedColorType::Rgba8)?;

        Ok(())
    }

    /// Encodes a raw RGBA buffer as PNG bytes in memory.
    pub fn encode_png(
        width: u32,
        height: u32,
        buffer: &[u8],
    ) -> Result<Vec<u8>, ImageError> {
        check_len(width, height, buffer)?;
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            buffer,
            width,
            height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(png)
    }

    pub fn png_data_uri(png: &[u8]) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(png))
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = vec![255u8; (width * height * 4) as usize];
        let mut intensity = 0u8;
        for i in buffer.chunks_mut(4) {
            i[0] = intensity;
            i[1] = intensity;
            i[2] = intensity;
            intensity = intensity.wrapping_add(1);
        }
        buffer
    }

    #[test]
    fn save_keeps_width_and_height_apart() {
        let (width, height) = (40u32, 25u32);
        let path = std::env::temp_dir().join(format!("salon_vision_{}_wide.png", std::process::id()));

        save(&path, width, height, &gradient(width, height)).expect("Error Saving File.");
        let decoded = image::open(&path).expect("Error Reading File.");
        std::fs::remove_file(&path).ok();

        assert_eq!((decoded.width(), decoded.height()), (width, height));
    }

    #[test]
    fn encoded_png_decodes_to_the_same_pixels() {
        let buffer = gradient(7, 3);
        let png = encode_png(7, 3, &buffer).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.into_raw(), buffer);
    }

    #[test]
    fn data_uri_has_png_prefix() {
        let png = encode_png(1, 1, &[1, 2, 3, 255]).unwrap();
        assert!(png_data_uri(&png).starts_with("data:image/png;base64,iVBOR"));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(encode_png(2, 2, &[0u8; 4]).is_err());
    }
}
