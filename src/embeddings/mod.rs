// Embeddings module
// Image decoding, CLIP feature extraction and batch generation of embedding records

pub mod batch;
pub mod encoder;

pub use batch::{EmbeddingRecord, generate_embeddings, read_embeddings, write_embeddings};
pub use encoder::{
    ClipEncoder, EncoderModel, ImageEncoder, decode_image, embed_image, embed_images, l2_normalize,
    load_image,
};
