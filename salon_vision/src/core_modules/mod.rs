pub mod color_sampler;
pub mod face_locator;
pub mod feature_analyzer;
pub mod pixel;
pub mod pixel_buffer;
pub mod scrfd;
pub mod skin_tone;
pub mod tag_rules;
pub mod tag_set;
pub mod tagged_photo;
pub mod utils;
