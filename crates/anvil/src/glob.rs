use crate::error::{AnvilError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Component {
    DoubleWildcard,
    Wildcard(Vec<char>),
    Normal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glob {
    pattern: String,
    components: Vec<Component>,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim_start_matches("./").trim_start_matches('/');

        if trimmed.is_empty() {
            return Err(AnvilError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let mut components = Vec::new();
        for part in trimmed.split('/') {
            if part.is_empty() {
                return Err(AnvilError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: "empty path component".to_string(),
                });
            }

            let component = if part == "**" {
                // Consecutive `**` are equivalent to one.
                if components.last() == Some(&Component::DoubleWildcard) {
                    continue;
                }
                Component::DoubleWildcard
            } else if part.contains(['*', '?']) {
                Component::Wildcard(part.chars().collect())
            } else {
                Component::Normal(part.to_string())
            };
            components.push(component);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            components,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_components(&self.components, &segments)
    }
}

fn match_components(components: &[Component], segments: &[&str]) -> bool {
    let Some((first, rest)) = components.split_first() else {
        return segments.is_empty();
    };

    match first {
        Component::DoubleWildcard => {
            (0..=segments.len()).any(|skip| match_components(rest, &segments[skip..]))
        }
        Component::Wildcard(pattern) => match segments.split_first() {
            Some((segment, remaining)) => {
                let name: Vec<char> = segment.chars().collect();
                match_segment(pattern, &name) && match_components(rest, remaining)
            }
            None => false,
        },
        Component::Normal(literal) => match segments.split_first() {
            Some((segment, remaining)) => {
                segment == literal && match_components(rest, remaining)
            }
            None => false,
        },
    }
}

fn match_segment(pattern: &[char], name: &[char]) -> bool {
    let mut p = 0;
    let mut n = 0;
    let mut star: Option<usize> = None;
    let mut star_match = 0;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_match = n;
            p += 1;
        } else if let Some(star_position) = star {
            p = star_position + 1;
            star_match += 1;
            n = star_match;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        Glob::new(pattern).unwrap().is_match(path)
    }

    #[test]
    fn test_double_wildcard_matches_zero_segments() {
        assert!(matches("**/index.*", "index.md"));
        assert!(matches("**/index.*", "about/index.html"));
        assert!(matches("**/index.*", "a/b/c/index.md"));
        assert!(!matches("**/index.*", "about/contact.md"));
    }

    #[test]
    fn test_prefixed_double_wildcard() {
        assert!(matches("stories/**/*", "stories/first.md"));
        assert!(matches("stories/**/*", "stories/2016/first.md"));
        assert!(!matches("stories/**/*", "stories"));
        assert!(!matches("stories/**/*", "pages/first.md"));
    }

    #[test]
    fn test_single_star_does_not_cross_slash() {
        assert!(matches("*.md", "post.md"));
        assert!(!matches("*.md", "stories/post.md"));
    }

    #[test]
    fn test_question_mark_and_backtracking() {
        assert!(matches("file?.txt", "file1.txt"));
        assert!(!matches("file?.txt", "file10.txt"));
        assert!(matches("*a*b", "xaxxab"));
        assert!(!matches("*a*b", "xaxxa"));
    }

    #[test]
    fn test_literal_pattern() {
        assert!(matches("about/index.md", "about/index.md"));
        assert!(!matches("about/index.md", "about/index.html"));
    }

    #[test]
    fn test_leading_dot_slash_is_ignored() {
        assert!(matches("./stories/*", "stories/a.md"));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(matches!(
            Glob::new(""),
            Err(AnvilError::InvalidPattern { .. })
        ));
        assert!(matches!(
            Glob::new("a//b"),
            Err(AnvilError::InvalidPattern { .. })
        ));
    }
}
