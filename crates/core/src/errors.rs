use thiserror::Error;

use crate::catalog::FetchError;
use crate::embeddings::EmbeddingError;

/// Request-level failure taxonomy. Every variant is recoverable at the
/// request boundary: the bot always answers with a fixed user-facing
/// message and never lets a single turn take the process down.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BotError {
    #[error(transparent)]
    ProviderUnavailable(#[from] EmbeddingError),
    #[error(transparent)]
    FetchFailed(#[from] FetchError),
    #[error("re-sort requested without a prior search")]
    NoPriorKeyword,
    #[error("utterance did not match any supported intent")]
    UnknownIntent,
}

impl BotError {
    /// Fixed user-readable fallback string for each failure class.
    ///
    /// `ProviderUnavailable` deliberately reads differently from
    /// `UnknownIntent`: "couldn't even try" is not "couldn't understand".
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "ระบบไม่พร้อมใช้งานชั่วคราว โปรดลองใหม่อีกครั้ง",
            Self::FetchFailed(_) => "เกิดข้อผิดพลาดในการดึงข้อมูล โปรดลองใหม่อีกครั้ง",
            Self::NoPriorKeyword => "ยังไม่มีคำค้นหาก่อนหน้า กรุณาค้นหาหนังสือก่อนแล้วจึงเรียงลำดับผลลัพธ์",
            Self::UnknownIntent => "ฟังก์ชันนี้ยังไม่รองรับการค้นหาอื่น ๆ",
        }
    }
}
