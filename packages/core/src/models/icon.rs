//! Node Icons
//!
//! Icons are stored as string keys in the `icon` column. This module resolves
//! them into a closed enumeration at compile time; keys that are not known
//! resolve to `NodeIcon::Unknown`, which renders as the default circle.

use std::fmt;

macro_rules! node_icons {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        /// Supported node icons
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum NodeIcon {
            $($variant,)+
            /// Stored key that this build does not know about
            Unknown(String),
        }

        impl NodeIcon {
            /// Every known icon, in picker order
            pub const ALL: &'static [NodeIcon] = &[$(NodeIcon::$variant,)+];

            /// Resolve a stored key
            pub fn from_key(key: &str) -> Self {
                match key {
                    $($key => NodeIcon::$variant,)+
                    other => NodeIcon::Unknown(other.to_string()),
                }
            }

            /// Key written to storage
            pub fn key(&self) -> &str {
                match self {
                    $(NodeIcon::$variant => $key,)+
                    NodeIcon::Unknown(key) => key,
                }
            }
        }
    };
}

node_icons! {
    Activity => "Activity",
    Dumbbell => "Dumbbell",
    Footprints => "Footprints",
    Heart => "Heart",
    Zap => "Zap",
    Flame => "Flame",
    Brain => "Brain",
    Sparkles => "Sparkles",
    Lightbulb => "Lightbulb",
    Eye => "Eye",
    Smile => "Smile",
    Timer => "Timer",
    Clock => "Clock",
    Calendar => "Calendar",
    Sun => "Sun",
    Moon => "Moon",
    Sunrise => "Sunrise",
    Sunset => "Sunset",
    Droplet => "Droplet",
    Coffee => "Coffee",
    Utensils => "Utensils",
    Apple => "Apple",
    CupSoda => "CupSoda",
    Book => "Book",
    BookOpen => "BookOpen",
    PenTool => "PenTool",
    Target => "Target",
    Briefcase => "Briefcase",
    Home => "Home",
    Bed => "Bed",
    Bath => "Bath",
    Brush => "Brush",
    Key => "Key",
    Music => "Music",
    Palette => "Palette",
    Camera => "Camera",
    Headphones => "Headphones",
    Mic => "Mic",
    TreePine => "TreePine",
    Flower => "Flower",
    Cloud => "Cloud",
    Wind => "Wind",
    Mountain => "Mountain",
    Circle => "Circle",
    Star => "Star",
    Trophy => "Trophy",
    Award => "Award",
    Gem => "Gem",
    Anchor => "Anchor",
    Compass => "Compass",
}

/// Picker category with its icons
#[derive(Debug, Clone, Copy)]
pub struct IconCategory {
    pub name: &'static str,
    pub icons: &'static [NodeIcon],
}

/// Icon picker groups
pub const ICON_CATEGORIES: &[IconCategory] = &[
    IconCategory {
        name: "Activity & sport",
        icons: &[
            NodeIcon::Activity,
            NodeIcon::Dumbbell,
            NodeIcon::Footprints,
            NodeIcon::Heart,
            NodeIcon::Zap,
            NodeIcon::Flame,
        ],
    },
    IconCategory {
        name: "Mind",
        icons: &[
            NodeIcon::Brain,
            NodeIcon::Sparkles,
            NodeIcon::Lightbulb,
            NodeIcon::Eye,
            NodeIcon::Smile,
        ],
    },
    IconCategory {
        name: "Time",
        icons: &[
            NodeIcon::Timer,
            NodeIcon::Clock,
            NodeIcon::Calendar,
            NodeIcon::Sun,
            NodeIcon::Moon,
            NodeIcon::Sunrise,
            NodeIcon::Sunset,
        ],
    },
    IconCategory {
        name: "Food & water",
        icons: &[
            NodeIcon::Droplet,
            NodeIcon::Coffee,
            NodeIcon::Utensils,
            NodeIcon::Apple,
            NodeIcon::CupSoda,
        ],
    },
    IconCategory {
        name: "Learning & work",
        icons: &[
            NodeIcon::Book,
            NodeIcon::BookOpen,
            NodeIcon::PenTool,
            NodeIcon::Target,
            NodeIcon::Briefcase,
        ],
    },
    IconCategory {
        name: "Home",
        icons: &[
            NodeIcon::Home,
            NodeIcon::Bed,
            NodeIcon::Bath,
            NodeIcon::Brush,
            NodeIcon::Key,
        ],
    },
    IconCategory {
        name: "Music & creativity",
        icons: &[
            NodeIcon::Music,
            NodeIcon::Palette,
            NodeIcon::Camera,
            NodeIcon::Headphones,
            NodeIcon::Mic,
        ],
    },
    IconCategory {
        name: "Nature",
        icons: &[
            NodeIcon::TreePine,
            NodeIcon::Flower,
            NodeIcon::Cloud,
            NodeIcon::Wind,
            NodeIcon::Mountain,
        ],
    },
    IconCategory {
        name: "Misc",
        icons: &[
            NodeIcon::Circle,
            NodeIcon::Star,
            NodeIcon::Trophy,
            NodeIcon::Award,
            NodeIcon::Gem,
            NodeIcon::Anchor,
            NodeIcon::Compass,
        ],
    },
];

impl NodeIcon {
    /// Icon to actually render: unknown keys fall back to the circle
    pub fn resolved(&self) -> NodeIcon {
        match self {
            NodeIcon::Unknown(_) => NodeIcon::Circle,
            known => known.clone(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, NodeIcon::Unknown(_))
    }

    /// Case-insensitive search used by the picker filter box
    pub fn search(query: &str) -> Vec<NodeIcon> {
        let query = query.trim().to_lowercase();
        Self::ALL
            .iter()
            .filter(|icon| query.is_empty() || icon.key().to_lowercase().contains(&query))
            .cloned()
            .collect()
    }
}

impl Default for NodeIcon {
    fn default() -> Self {
        NodeIcon::Circle
    }
}

impl fmt::Display for NodeIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_resolve() {
        assert_eq!(NodeIcon::from_key("Droplet"), NodeIcon::Droplet);
        assert_eq!(NodeIcon::from_key("BookOpen").key(), "BookOpen");
    }

    #[test]
    fn test_unknown_key_falls_back() {
        let icon = NodeIcon::from_key("Rocket");
        assert_eq!(icon, NodeIcon::Unknown("Rocket".to_string()));
        assert!(!icon.is_known());
        assert_eq!(icon.resolved(), NodeIcon::Circle);
        // The stored key is preserved for round trips
        assert_eq!(icon.key(), "Rocket");
    }

    #[test]
    fn test_categories_cover_all_icons() {
        let total: usize = ICON_CATEGORIES.iter().map(|c| c.icons.len()).sum();
        assert_eq!(total, NodeIcon::ALL.len());
    }

    #[test]
    fn test_search() {
        let hits = NodeIcon::search("sun");
        assert_eq!(
            hits,
            vec![NodeIcon::Sun, NodeIcon::Sunrise, NodeIcon::Sunset]
        );
        assert_eq!(NodeIcon::search("").len(), NodeIcon::ALL.len());
    }
}
