//! Static CDP documentation and the keyword matcher used when the LLM is unavailable.
//!
//! Everything here is read-only after construction; the process-wide instance
//! lives behind `document_store()`.

use crate::models::Platform;
use std::collections::HashMap;

/// Returned when neither the platform nor a topic can be recognised.
pub const GENERIC_RESPONSE: &str = "I couldn't find documentation that matches your question. \
Try mentioning the platform (Segment, mParticle, Lytics or Zeotap) and what you want to do, \
for example \"How do I set up a source in Segment?\".";

/// Appended to every keyword-matched answer.
pub const DOCUMENTATION_LINKS: &str = "\n\n---\nThis answer was generated from local documentation \
because the AI service is currently unavailable. For complete and up-to-date guides see:\n\
- Segment: https://segment.com/docs/\n\
- mParticle: https://docs.mparticle.com/\n\
- Lytics: https://docs.lytics.com/\n\
- Zeotap: https://docs.zeotap.com/";

/// Rendered for any platform or aspect without a specific entry.
pub const STANDARD_FUNCTIONALITY: &str = "Standard functionality available";

const GENERIC_CONFIDENCE: f64 = 0.3;
const UNMATCHED_TOPIC_CONFIDENCE: f64 = 0.6;
const COMPARISON_CONFIDENCE: f64 = 0.85;

lazy_static::lazy_static! {
    static ref DOCUMENT_STORE: DocumentStore = DocumentStore::new();
}

/// Shared, immutable store built on first use.
pub fn document_store() -> &'static DocumentStore {
    &DOCUMENT_STORE
}

/// Result of a local lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub content: String,
    pub platform: Platform,
    pub confidence: f64,
}

impl ContentMatch {
    fn generic() -> Self {
        Self {
            content: GENERIC_RESPONSE.to_string(),
            platform: Platform::Multiple,
            confidence: GENERIC_CONFIDENCE,
        }
    }
}

/// Topic categories scored against a question, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCategory {
    Source,
    User,
    Audience,
    Tracking,
    Campaign,
}

impl TopicCategory {
    pub const ALL: [TopicCategory; 5] = [
        TopicCategory::Source,
        TopicCategory::User,
        TopicCategory::Audience,
        TopicCategory::Tracking,
        TopicCategory::Campaign,
    ];

    /// Categories that `compare_cdps` understands.
    pub const FEATURES: [TopicCategory; 4] = [
        TopicCategory::Source,
        TopicCategory::User,
        TopicCategory::Audience,
        TopicCategory::Tracking,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TopicCategory::Source => "source",
            TopicCategory::User => "user",
            TopicCategory::Audience => "audience",
            TopicCategory::Tracking => "tracking",
            TopicCategory::Campaign => "campaign",
        }
    }

    pub fn from_feature_key(key: &str) -> Option<TopicCategory> {
        Self::FEATURES
            .iter()
            .copied()
            .find(|feature| feature.key() == key.trim().to_lowercase())
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            TopicCategory::Source => &[
                "source", "setup", "set up", "integration", "connect", "install", "sdk", "import",
            ],
            TopicCategory::User => &[
                "user", "profile", "identity", "customer", "resolution", "merge",
            ],
            TopicCategory::Audience => &[
                "audience", "segmentation", "cohort", "targeting", "trait",
            ],
            TopicCategory::Tracking => &[
                "track", "event", "debug", "data plan", "validation",
            ],
            TopicCategory::Campaign => &[
                "campaign", "marketing", "activation", "personalization", "email",
            ],
        }
    }

    /// Snippet keys tried in order for a platform.
    pub fn snippet_chain(&self) -> &'static [&'static str] {
        match self {
            TopicCategory::Source => &["source_setup", "integration", "data_import"],
            TopicCategory::User => &["user_profiles", "identity_resolution"],
            TopicCategory::Audience => &["audience_creation", "segmentation"],
            TopicCategory::Tracking => &["basic_tracking", "data_planning", "debugging"],
            TopicCategory::Campaign => &["campaign_setup"],
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            TopicCategory::Source => 0.9,
            TopicCategory::User | TopicCategory::Audience => 0.85,
            TopicCategory::Tracking | TopicCategory::Campaign => 0.8,
        }
    }

    fn comparison_title(&self) -> &'static str {
        match self {
            TopicCategory::Source => "Source Setup",
            TopicCategory::User => "User Profiles & Identity",
            TopicCategory::Audience => "Audience Segmentation",
            TopicCategory::Tracking => "Event Tracking",
            TopicCategory::Campaign => "Campaigns",
        }
    }

    /// Number of this category's keywords found in a lower-cased question.
    fn score(&self, question: &str) -> usize {
        self.keywords()
            .iter()
            .filter(|keyword| question.contains(*keyword))
            .count()
    }
}

/// First known platform mentioned in a lower-cased question, else `Multiple`.
pub fn detect_platform(question: &str) -> Platform {
    Platform::KNOWN
        .iter()
        .copied()
        .find(|platform| question.contains(platform.key()))
        .unwrap_or(Platform::Multiple)
}

/// Highest-scoring topic; ties keep the earliest-declared one and zero scores never win.
pub fn best_topic(question: &str) -> Option<TopicCategory> {
    let mut best: Option<(TopicCategory, usize)> = None;
    for topic in TopicCategory::ALL {
        let score = topic.score(question);
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((topic, score)),
        }
    }
    best.map(|(topic, _)| topic)
}

/// First comparison feature whose keywords appear in a lower-cased question.
pub fn mentioned_feature(question: &str) -> Option<TopicCategory> {
    TopicCategory::FEATURES
        .iter()
        .copied()
        .find(|feature| feature.score(question) > 0)
}

pub struct DocumentStore {
    docs: HashMap<Platform, Vec<(&'static str, &'static str)>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        let mut docs = HashMap::new();
        docs.insert(Platform::Segment, segment_docs());
        docs.insert(Platform::Mparticle, mparticle_docs());
        docs.insert(Platform::Lytics, lytics_docs());
        docs.insert(Platform::Zeotap, zeotap_docs());
        Self { docs }
    }

    /// One snippet, or every snippet of the platform joined by blank lines.
    pub fn doc_content(&self, platform: Platform, topic: Option<&str>) -> Option<String> {
        let platform_docs = self.docs.get(&platform)?;
        match topic {
            Some(topic) => platform_docs
                .iter()
                .find(|(key, _)| *key == topic)
                .map(|(_, snippet)| snippet.to_string()),
            None => Some(
                platform_docs
                    .iter()
                    .map(|(_, snippet)| *snippet)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
        }
    }

    fn snippet_for(&self, platform: Platform, topic: TopicCategory) -> Option<&'static str> {
        let platform_docs = self.docs.get(&platform)?;
        topic.snippet_chain().iter().find_map(|wanted| {
            platform_docs
                .iter()
                .find(|(key, _)| key == wanted)
                .map(|(_, snippet)| *snippet)
        })
    }

    fn first_snippet(&self, platform: Platform) -> Option<&'static str> {
        self.docs
            .get(&platform)
            .and_then(|platform_docs| platform_docs.first())
            .map(|(_, snippet)| *snippet)
    }

    pub fn find_relevant_content(&self, question: &str) -> ContentMatch {
        let question = question.to_lowercase();
        let platform = detect_platform(&question);
        if platform == Platform::Multiple {
            return ContentMatch::generic();
        }

        if let Some(topic) = best_topic(&question) {
            if let Some(snippet) = self.snippet_for(platform, topic) {
                return ContentMatch {
                    content: snippet.to_string(),
                    platform,
                    confidence: topic.confidence(),
                };
            }
        }

        match self.first_snippet(platform) {
            Some(snippet) => ContentMatch {
                content: snippet.to_string(),
                platform,
                confidence: UNMATCHED_TOPIC_CONFIDENCE,
            },
            None => ContentMatch::generic(),
        }
    }

    pub fn compare_cdps(&self, feature_key: &str) -> ContentMatch {
        let feature = match TopicCategory::from_feature_key(feature_key) {
            Some(feature) => feature,
            None => return ContentMatch::generic(),
        };

        let mut sections = vec![format!("# {} Comparison", feature.comparison_title())];
        for platform in Platform::KNOWN {
            let snippet = self
                .snippet_for(platform, feature)
                .unwrap_or(STANDARD_FUNCTIONALITY);
            sections.push(format!("## {}\n{}", platform.display_name(), snippet));
        }

        let mut differences = vec!["## Key Differences".to_string()];
        for (aspect, entries) in highlights(feature) {
            let mut lines = vec![format!("### {}", aspect)];
            for platform in Platform::KNOWN {
                let highlight = entries
                    .iter()
                    .find(|(p, _)| *p == platform)
                    .map(|(_, text)| *text)
                    .unwrap_or(STANDARD_FUNCTIONALITY);
                lines.push(format!("- {}: {}", platform.display_name(), highlight));
            }
            differences.push(lines.join("\n"));
        }
        sections.push(differences.join("\n\n"));

        ContentMatch {
            content: sections.join("\n\n"),
            platform: Platform::Multiple,
            confidence: COMPARISON_CONFIDENCE,
        }
    }
}

type Highlights = &'static [(&'static str, &'static [(Platform, &'static str)])];

fn highlights(feature: TopicCategory) -> Highlights {
    match feature {
        TopicCategory::Source => &[
            (
                "Setup Process",
                &[
                    (Platform::Segment, "Catalog-driven sources with a per-source write key"),
                    (Platform::Mparticle, "Inputs configured per platform with key/secret pairs"),
                    (
                        Platform::Lytics,
                        "Integrations and file imports managed from the Data section",
                    ),
                    (Platform::Zeotap, "Guided integration flows with mapping templates"),
                ],
            ),
            (
                "Supported Sources",
                &[
                    (Platform::Segment, "400+ web, mobile, server and cloud-app sources"),
                    (
                        Platform::Mparticle,
                        "Native SDKs for web, iOS, Android and feeds from partners",
                    ),
                    (Platform::Lytics, "JavaScript tag, APIs, CSV and warehouse imports"),
                ],
            ),
        ],
        TopicCategory::User => &[
            (
                "Identity Resolution",
                &[
                    (Platform::Segment, "Identity graph with configurable merge rules (Unify)"),
                    (Platform::Mparticle, "IDSync with customizable identity strategies"),
                    (Platform::Lytics, "Deterministic stitching across configured identifiers"),
                    (
                        Platform::Zeotap,
                        "Deterministic and probabilistic ID graph with consent handling",
                    ),
                ],
            ),
            (
                "Profile Storage",
                &[
                    (Platform::Segment, "Profiles API with traits and event history"),
                    (Platform::Mparticle, "User profiles with attributes and audience memberships"),
                    (Platform::Lytics, "Behavioral scores alongside profile fields"),
                ],
            ),
        ],
        TopicCategory::Audience => &[
            (
                "Audience Builder",
                &[
                    (Platform::Segment, "Engage audiences from events, traits and computed traits"),
                    (Platform::Mparticle, "Real-time and standard audiences in the Audiences UI"),
                    (Platform::Lytics, "Behavior-based segments with content affinity scoring"),
                    (Platform::Zeotap, "Rule-based segment builder with enrichment data"),
                ],
            ),
            (
                "Real-time Updates",
                &[
                    (Platform::Segment, "Streaming audience membership updates"),
                    (Platform::Mparticle, "Real-time audiences evaluated on ingest"),
                ],
            ),
        ],
        TopicCategory::Tracking => &[
            (
                "Implementation",
                &[
                    (Platform::Segment, "Tracking plan with identify, track and page calls"),
                    (Platform::Mparticle, "Data plans enforced at the SDK and server"),
                    (Platform::Lytics, "JavaScript tag collects page and custom events"),
                ],
            ),
            (
                "Data Validation",
                &[
                    (Platform::Segment, "Protocols flags and blocks violations"),
                    (Platform::Mparticle, "Live stream and data plan violation reports"),
                ],
            ),
        ],
        TopicCategory::Campaign => &[],
    }
}

fn segment_docs() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "source_setup",
            "To set up a new source in Segment:\n\
1. Log in to your Segment workspace\n\
2. Click on \"Add Source\" in the Sources section\n\
3. Choose your source type from the catalog\n\
4. Follow the source-specific setup instructions\n\
5. Configure the settings and obtain your write key\n\
For more details, visit: https://segment.com/docs/connections/sources/",
        ),
        (
            "basic_tracking",
            "To track events with Segment:\n\
1. Install analytics.js or the SDK for your platform\n\
2. Call identify() when a user logs in or signs up\n\
3. Call track() with an event name and properties for each action\n\
4. Call page() or screen() for page and screen views\n\
5. Verify the calls arrive in the source debugger",
        ),
        (
            "debugging",
            "To debug a Segment implementation:\n\
1. Open the Debugger tab of your source\n\
2. Trigger the event and confirm it appears live\n\
3. Inspect the raw payload for missing properties\n\
4. Check the Event Delivery view on each destination for errors",
        ),
        (
            "user_profiles",
            "To work with user profiles in Segment:\n\
1. Enable Unify (Profiles) for your workspace\n\
2. Configure identity resolution rules and identifier priority\n\
3. Connect the sources whose data should build profiles\n\
4. Browse profiles in the Profile explorer or query the Profiles API",
        ),
        (
            "audience_creation",
            "To create an audience in Segment Engage:\n\
1. Go to Engage > Audiences and click \"New\"\n\
2. Add conditions on events, traits or computed traits\n\
3. Preview the audience size\n\
4. Select destinations and save the audience",
        ),
    ]
}

fn mparticle_docs() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "source_setup",
            "To set up a data source (input) in mParticle:\n\
1. Go to Setup > Inputs\n\
2. Select the platform or feed you want to add\n\
3. Issue a key and secret for the input\n\
4. Initialize the mParticle SDK with those credentials\n\
5. Confirm incoming data in the Live Stream",
        ),
        (
            "user_profiles",
            "To manage user profiles in mParticle:\n\
1. Define your identity strategy in IDSync\n\
2. Send login, logout and modify identity requests from the SDK\n\
3. Set user attributes with setUserAttribute()\n\
4. Look up profiles in the User Activity view or the Profile API",
        ),
        (
            "data_planning",
            "Best practices for data planning in mParticle:\n\
1. Create a data plan describing every event and attribute\n\
2. Use the Data Planning API to version plans\n\
3. Enable blocking of unplanned data once the plan is stable\n\
4. Review violation reports regularly",
        ),
        (
            "audience_creation",
            "To create an audience in mParticle:\n\
1. Open Audiences > Real-time (or Standard)\n\
2. Click \"New Audience\" and select the inputs to evaluate\n\
3. Add criteria on events and user attributes\n\
4. Connect the audience to one or more outputs",
        ),
    ]
}

fn lytics_docs() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "audience_creation",
            "To create an audience in Lytics:\n\
1. Open Audiences and click \"Create New\"\n\
2. Build rules from profile fields, behaviors and content affinities\n\
3. Review the audience size and overlap\n\
4. Save and export the audience to connected channels",
        ),
        (
            "data_import",
            "To import data into Lytics:\n\
1. Go to Data > Integrations and choose a provider or file import\n\
2. Authorize the connection\n\
3. Map incoming fields to the Lytics schema\n\
4. Start the import job and monitor its status",
        ),
        (
            "campaign_setup",
            "To set up a campaign in Lytics:\n\
1. Open Campaigns and create a new experience\n\
2. Choose the target audience\n\
3. Select the channel (web personalization, email, ads)\n\
4. Configure the content and schedule, then activate",
        ),
        (
            "basic_tracking",
            "To track behavior with Lytics:\n\
1. Install the Lytics JavaScript tag on every page\n\
2. Collect custom events with jstag.send()\n\
3. Verify events in the data streams view",
        ),
    ]
}

fn zeotap_docs() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "integration",
            "To integrate data with Zeotap:\n\
1. Open Sources and select the integration type (SDK, API, file or warehouse)\n\
2. Provide credentials or upload a sample file\n\
3. Map source fields to the Zeotap catalogue\n\
4. Activate the source and review the ingestion summary",
        ),
        (
            "identity_resolution",
            "Guide for identity resolution in Zeotap:\n\
1. Configure the identifiers collected by each source\n\
2. Set the ID graph matching rules and priorities\n\
3. Review consent settings for every identifier\n\
4. Inspect unified profiles in the Customer 360 view",
        ),
        (
            "segmentation",
            "To build customer segments in Zeotap:\n\
1. Open Audiences and start a new segment\n\
2. Combine first-party attributes with enrichment data\n\
3. Estimate reach before saving\n\
4. Activate the segment to destinations",
        ),
    ]
}
