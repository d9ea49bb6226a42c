//! Persona text and the user-facing strings the bot sends.

use crate::chatbot::adapter::{CompletionResult, MISSING_CREDENTIALS};

/// Built-in persona: a Persian-speaking study assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
تو یک دستیار هوشمند و دلسوز دانشجویان هستی که به زبان فارسی پاسخ می‌دهی.
وظیفه اصلی تو پاسخ دادن به سوالات درسی، پروژه‌ای، برنامه‌نویسی و ارائه راهنمایی‌های تحصیلی است.

قواعد مهم:
1. پاسخ به سوالات درسی: همیشه جامع، دقیق و با لحنی محترمانه باشد.
2. اگر سوال به زبان دیگری پرسیده شد، به همان زبان پاسخ بده.
3. سوال درباره سازنده: اگر پرسیدند چه کسی تو را ساخته، بگو که با استفاده از هوش مصنوعی گوگل (Gemini) توسعه داده شده‌ای.
";

pub const SAFETY_REFUSAL: &str =
    "⚠️ متأسفم، به دلیل قوانین ایمنی نمی‌توانم به این سوال پاسخ دهم.";

pub const NOT_CONFIGURED: &str =
    "⚠️ خطای سیستم: سرویس پاسخ‌گویی هنوز پیکربندی نشده است.";

pub const TRY_AGAIN_LATER: &str =
    "❌ خطا در دریافت پاسخ. لطفاً کمی بعد دوباره تلاش کنید.";

pub const DELIVERY_FAILED: &str =
    "❌ ارسال پاسخ کامل ممکن نشد. لطفاً دوباره تلاش کنید یا سوال را کوتاه‌تر بپرسید.";

/// Greeting for `/start`.
pub fn welcome_text(first_name: &str) -> String {
    format!(
        "سلام {first_name} عزیز! 😊\n\
         من دستیار هوشمند دانشجویی هستم.\n\
         هر سوال درسی یا برنامه‌نویسی داری از من بپرس."
    )
}

pub fn help_text() -> String {
    "سوالت را به صورت یک پیام متنی بفرست تا پاسخ بدهم.\n\n\
     /start - شروع گفتگو\n\
     /help - راهنما"
        .to_string()
}

/// What the user sees for each completion outcome.
pub fn reply_text(result: &CompletionResult) -> String {
    match result {
        CompletionResult::Success(text) => text.clone(),
        CompletionResult::SafetyBlocked => SAFETY_REFUSAL.to_string(),
        CompletionResult::Failure(detail) if detail == MISSING_CREDENTIALS => {
            NOT_CONFIGURED.to_string()
        }
        CompletionResult::Failure(_) => TRY_AGAIN_LATER.to_string(),
    }
}
