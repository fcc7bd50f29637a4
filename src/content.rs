use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Payload handed to the shell's project modal
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub image: String,
    pub description: String,
    pub external_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What a trigger region opens when activated
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    About,
    Contact,
    Project(Project),
    /// middle slot with no project to show, never activates
    Empty,
}

impl Content {
    /// Text painted on the region
    pub fn label(&self) -> String {
        match self {
            Content::About => "ABOUT".to_string(),
            Content::Contact => "CONTACT".to_string(),
            Content::Project(project) => project.title.to_uppercase(),
            Content::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }
}

fn project(title: &str, image: &str, description: &str, url: &str, tags: &[&str]) -> Project {
    Project {
        title: title.to_string(),
        image: image.to_string(),
        description: description.to_string(),
        external_url: url.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// Built-in showcase, used when the shell doesn't pass its own list
pub static CATALOG: Lazy<Vec<Project>> = Lazy::new(|| {
    vec![
        project(
            "Talking Objects",
            "./TO_fitted.png",
            "An interactive application that brings everyday objects to life through AI-powered conversations.",
            "https://talkobj.vercel.app/",
            &["React", "AI", "Node.js"],
        ),
        project(
            "Portfolio Risk Dashboard",
            "./PR1_fitted.png",
            "A portfolio risk management dashboard with real-time analytics and interactive charts.",
            "https://github.com/Skugane6/Portfolio-Risk-Dashboard",
            &["React", "D3.js", "Finance APIs"],
        ),
        project(
            "Pet Recommendation App",
            "./pet_fitted.png",
            "Explore adoptable pets from the Petfinder API, ranked against answers to personalized questions.",
            "https://www.youtube.com/watch?v=0Tip-LDCYig&t=87s",
            &["React", "Express.js", "Petfinder API"],
        ),
        project(
            "Eye Tracking Mouse",
            "./eye.png",
            "Tracks the user's eyes with MediaPipe and OpenCV and moves the cursor along with them.",
            "https://github.com/Skugane6/eye-mouse",
            &["Python", "MediaPipe", "OpenCV"],
        ),
        project(
            "iFinance Application",
            "./ifinance_fitted.png",
            "Personal finance manager built on double-entry bookkeeping, with user accounts.",
            "https://github.com/Skugane6/iFinance",
            &["Java", "SQL", "JavaFX"],
        ),
        project(
            "Avatar Game",
            "./avatargame_fitted.png",
            "Fight elemental monsters across four levels, upgrade stats at the shop, then face the boss.",
            "https://github.com/Skugane6/avatar-game",
            &["Python", "Pygame"],
        ),
    ]
});
