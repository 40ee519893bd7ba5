pub(crate) mod openai;

pub use openai::{generate_reply_body, send_classification_prompt};
