//! Spoken prompts for provider-facing documents (German market)

pub const NUMBER_NOT_CONFIGURED: &str = "Diese Nummer ist nicht konfiguriert. Auf Wiederhören.";

pub const OUTSIDE_BUSINESS_HOURS: &str = "Vielen Dank für Ihren Anruf. Unser Büro ist derzeit geschlossen. Bitte rufen Sie während unserer Geschäftszeiten an.";

pub const FORWARD_GREETING: &str = "Einen Moment bitte, ich verbinde Sie.";

pub const VOICEMAIL_GREETING: &str = "Bitte hinterlassen Sie eine Nachricht nach dem Signalton.";

pub const AI_GREETING_ANONYMOUS: &str = "Guten Tag! Wie kann ich Ihnen helfen?";

pub const GATHER_PROMPT: &str = "Wie kann ich Ihnen weiterhelfen?";

/// Lead name stored for callers we cannot match to a lead
pub const UNKNOWN_CALLER: &str = "Unbekannt";

/// Agent script when the routing rule carries no greeting
pub const DEFAULT_CAMPAIGN_PROMPT: &str = "Sei freundlich und hilfsbereit.";

/// AI greeting for a recognised lead
pub fn ai_greeting_for(first_name: &str) -> String {
    format!("Guten Tag! Hallo {}, schön Sie wieder zu hören.", first_name)
}
