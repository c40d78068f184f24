//! TwiML protocol documents
//!
//! The provider fetches these documents from our webhooks and executes the
//! verbs in order. A malformed document drops the caller on a dead line, so
//! every text and attribute value is escaped by the XML writer.

use crate::domain::shared::{DomainError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Spoken when a call cannot be handled
pub const APOLOGY_TEXT: &str = "Es ist ein Fehler aufgetreten. Bitte versuchen Sie es später erneut.";

/// Pre-rendered apology used when rendering itself fails
pub const FALLBACK_DOCUMENT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Say language=\"de-DE\">Es ist ein Fehler aufgetreten. Bitte versuchen Sie es später erneut.</Say><Hangup/></Response>";

/// Content type of rendered documents
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Media stream opened by `<Connect>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub url: String,
    /// Custom parameters forwarded in the stream's start message
    pub parameters: Vec<(String, String)>,
}

impl Stream {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// Speech input collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub input: String,
    pub language: String,
    pub timeout_secs: u32,
    /// URL receiving the recognised speech
    pub action: String,
    /// Spoken while listening
    pub prompt: Option<String>,
}

/// TwiML verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say { text: String, language: String },
    Dial { number: String },
    Record { max_length_secs: u32, transcribe: bool },
    Gather(Gather),
    Connect(Stream),
    Hangup,
}

impl Verb {
    pub fn name(&self) -> &'static str {
        match self {
            Verb::Say { .. } => "Say",
            Verb::Dial { .. } => "Dial",
            Verb::Record { .. } => "Record",
            Verb::Gather(_) => "Gather",
            Verb::Connect(_) => "Connect",
            Verb::Hangup => "Hangup",
        }
    }
}

/// `<Response>` document builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` and end the call
    pub fn say_and_hangup(text: &str, language: &str) -> Self {
        Self::new().say(text, language).hangup()
    }

    /// Generic spoken apology followed by a hangup
    pub fn apology(language: &str) -> Self {
        Self::say_and_hangup(APOLOGY_TEXT, language)
    }

    pub fn say(mut self, text: &str, language: &str) -> Self {
        self.verbs.push(Verb::Say {
            text: text.to_string(),
            language: language.to_string(),
        });
        self
    }

    pub fn dial(mut self, number: &str) -> Self {
        self.verbs.push(Verb::Dial {
            number: number.to_string(),
        });
        self
    }

    pub fn record(mut self, max_length_secs: u32, transcribe: bool) -> Self {
        self.verbs.push(Verb::Record {
            max_length_secs,
            transcribe,
        });
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn connect(mut self, stream: Stream) -> Self {
        self.verbs.push(Verb::Connect(stream));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn has_verb(&self, name: &str) -> bool {
        self.verbs.iter().any(|v| v.name() == name)
    }

    /// Render the XML document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, Event::Start(BytesStart::new("Response")))?;
        for verb in &self.verbs {
            write_verb(&mut writer, verb)?;
        }
        write(&mut writer, Event::End(BytesEnd::new("Response")))?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| DomainError::Internal(format!("TwiML is not UTF-8: {}", e)))
    }

    /// Render, degrading to the pre-rendered apology on failure
    pub fn render(&self) -> String {
        match self.to_xml() {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!(error = %e, "Failed to render TwiML, sending fallback");
                FALLBACK_DOCUMENT.to_string()
            }
        }
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| DomainError::Internal(format!("TwiML write failed: {}", e)))
}

fn write_text_element(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write_verb(writer: &mut XmlWriter, verb: &Verb) -> Result<()> {
    match verb {
        Verb::Say { text, language } => {
            write_text_element(writer, "Say", &[("language", language.as_str())], text)
        }
        Verb::Dial { number } => write_text_element(writer, "Dial", &[], number),
        Verb::Record {
            max_length_secs,
            transcribe,
        } => {
            let max_length = max_length_secs.to_string();
            let mut record = BytesStart::new("Record");
            record.push_attribute(("maxLength", max_length.as_str()));
            record.push_attribute(("transcribe", if *transcribe { "true" } else { "false" }));
            write(writer, Event::Empty(record))
        }
        Verb::Gather(gather) => {
            let timeout = gather.timeout_secs.to_string();
            let mut start = BytesStart::new("Gather");
            start.push_attribute(("input", gather.input.as_str()));
            start.push_attribute(("language", gather.language.as_str()));
            start.push_attribute(("timeout", timeout.as_str()));
            start.push_attribute(("action", gather.action.as_str()));

            match &gather.prompt {
                Some(prompt) => {
                    write(writer, Event::Start(start))?;
                    write_text_element(
                        writer,
                        "Say",
                        &[("language", gather.language.as_str())],
                        prompt,
                    )?;
                    write(writer, Event::End(BytesEnd::new("Gather")))
                }
                None => write(writer, Event::Empty(start)),
            }
        }
        Verb::Connect(stream) => {
            write(writer, Event::Start(BytesStart::new("Connect")))?;

            let mut start = BytesStart::new("Stream");
            start.push_attribute(("url", stream.url.as_str()));
            write(writer, Event::Start(start))?;
            for (name, value) in &stream.parameters {
                let mut parameter = BytesStart::new("Parameter");
                parameter.push_attribute(("name", name.as_str()));
                parameter.push_attribute(("value", value.as_str()));
                write(writer, Event::Empty(parameter))?;
            }
            write(writer, Event::End(BytesEnd::new("Stream")))?;

            write(writer, Event::End(BytesEnd::new("Connect")))
        }
        Verb::Hangup => write(writer, Event::Empty(BytesStart::new("Hangup"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apology_document() {
        let xml = VoiceResponse::apology("de-DE").to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Say language=\"de-DE\">Es ist ein Fehler aufgetreten."));
        assert!(xml.contains("<Hangup/>"));
        assert!(xml.ends_with("</Response>"));
    }

    #[test]
    fn test_fallback_matches_rendered_apology() {
        let xml = VoiceResponse::apology("de-DE").to_xml().unwrap();
        assert_eq!(xml, FALLBACK_DOCUMENT);
    }

    #[test]
    fn test_connect_stream() {
        let xml = VoiceResponse::new()
            .connect(
                Stream::new("wss://media.example.com/stream?sessionId=abc")
                    .parameter("sessionId", "abc"),
            )
            .to_xml()
            .unwrap();

        assert!(xml.contains(
            "<Connect><Stream url=\"wss://media.example.com/stream?sessionId=abc\"><Parameter name=\"sessionId\" value=\"abc\"/></Stream></Connect>"
        ));
    }

    #[test]
    fn test_record_and_dial() {
        let xml = VoiceResponse::new()
            .record(120, true)
            .dial("+4930999")
            .to_xml()
            .unwrap();

        assert!(xml.contains("<Record maxLength=\"120\" transcribe=\"true\"/>"));
        assert!(xml.contains("<Dial>+4930999</Dial>"));
    }

    #[test]
    fn test_gather_with_prompt() {
        let xml = VoiceResponse::new()
            .gather(Gather {
                input: "speech".to_string(),
                language: "de-DE".to_string(),
                timeout_secs: 5,
                action: "https://ai.example.com/voice?sessionId=1&x=2".to_string(),
                prompt: Some("Wie kann ich helfen?".to_string()),
            })
            .to_xml()
            .unwrap();

        assert!(xml.contains("<Gather input=\"speech\" language=\"de-DE\" timeout=\"5\""));
        assert!(xml.contains("action=\"https://ai.example.com/voice?sessionId=1&amp;x=2\""));
        assert!(xml.contains("<Say language=\"de-DE\">Wie kann ich helfen?</Say></Gather>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = VoiceResponse::new()
            .say("<Hangup/> & mehr", "de-DE")
            .to_xml()
            .unwrap();

        assert!(xml.contains("&lt;Hangup/&gt; &amp; mehr"));
        assert!(!xml.contains("<Hangup/>"));
    }

    #[test]
    fn test_has_verb() {
        let response = VoiceResponse::say_and_hangup("Tschüss", "de-DE");
        assert!(response.has_verb("Say"));
        assert!(response.has_verb("Hangup"));
        assert!(!response.has_verb("Dial"));
        assert_eq!(response.verbs().len(), 2);
    }
}
