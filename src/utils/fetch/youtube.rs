//! Transcript retrieval from the captions YouTube exposes on the watch page.
//!
//! The watch page embeds a `"captionTracks": [...]` array; each track has a `baseUrl` serving the
//! timed text as XML (`<text start=".." dur="..">segment</text>`). The transcript is the decoded
//! segments joined with single spaces.

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};
use serde::Deserialize;
use crate::utils::fetch::{get_text, FetchError, FetchTranscript};

const WATCH_URL: &str = "https://www.youtube.com/watch";
const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

lazy_static! {
    static ref TEXT_SEGMENT_RE: Regex = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap();
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated captions, absent for manual ones.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeTranscripts {
    client: reqwest::Client,
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
}

impl YouTubeTranscripts {
    pub fn new() -> Self {
        Self::with_languages(vec!["en".to_string()])
    }

    pub fn with_languages(languages: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            languages,
        }
    }
}

impl Default for YouTubeTranscripts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchTranscript for YouTubeTranscripts {
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, FetchError> {
        let request = self.client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9");
        let page = get_text(request, WATCH_URL).await?;
        let tracks = extract_caption_tracks(&page, video_id)?;
        let track = choose_track(&tracks, &self.languages)
            .ok_or_else(|| no_transcript(video_id, "no caption tracks"))?;
        debug!("fetching {} captions of video {}", track.language_code, video_id);
        let request = self.client.get(track.base_url.as_str());
        let timed_text = get_text(request, &track.base_url).await?;
        let segments = parse_timed_text(&timed_text);
        if segments.is_empty() {
            return Err(no_transcript(video_id, "caption track is empty"));
        }
        Ok(segments.join(" "))
    }
}

fn no_transcript(video_id: &str, reason: &str) -> FetchError {
    FetchError::NoTranscript { video_id: video_id.to_string(), reason: reason.to_string() }
}

/// Cuts the JSON array following `"captionTracks":` out of the watch page and parses it.
pub(crate) fn extract_caption_tracks(page: &str, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError> {
    let start = page
        .find(CAPTION_TRACKS_KEY)
        .map(|idx| idx + CAPTION_TRACKS_KEY.len())
        .ok_or_else(|| no_transcript(video_id, "captions are disabled or the video does not exist"))?;
    let array = balanced_array(&page[start..])
        .ok_or_else(|| no_transcript(video_id, "unterminated caption track list"))?;
    serde_json::from_str(array).map_err(|e| no_transcript(video_id, &e.to_string()))
}

/// Returns the prefix of `s` that is one balanced JSON array, honoring string literals.
fn balanced_array(s: &str) -> Option<&str> {
    let s = s.trim_start();
    if !s.starts_with('[') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Manual captions in a preferred language, then generated ones in a preferred language, then the first track.
pub(crate) fn choose_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let preferred = |generated: bool| {
        languages.iter().find_map(|language| {
            tracks.iter().find(|t| t.language_code == *language && t.is_generated() == generated)
        })
    };
    preferred(false).or_else(|| preferred(true)).or_else(|| tracks.first())
}

/// Decoded, non-empty text segments of a timed-text XML document.
pub(crate) fn parse_timed_text(xml: &str) -> Vec<String> {
    TEXT_SEGMENT_RE
        .captures_iter(xml)
        .map(|captures| {
            // segments are entity-encoded twice (`&amp;#39;`), so decode until stable
            let mut text = captures[1].to_string();
            loop {
                let decoded = decode_entities(&text);
                if decoded == text {
                    break;
                }
                text = decoded;
            }
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect()
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |captures: &Captures| {
            let entity = &captures[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") => u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32),
                _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded.map_or_else(|| captures[0].to_string(), String::from)
        })
        .into_owned()
}
