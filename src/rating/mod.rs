/// Star rating from 1 to `max_rating`, with a hover preview and optional
/// per-star labels.
#[derive(Debug, Clone)]
pub struct StarRating {
    max_rating: u8,
    rating: u8,
    preview: u8,
    messages: Vec<String>,
}

impl StarRating {
    pub fn new(max_rating: u8) -> Self {
        Self {
            max_rating,
            rating: 0,
            preview: 0,
            messages: Vec::new(),
        }
    }

    /// Labels are only used when there is exactly one per star.
    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_default(mut self, rating: u8) -> Self {
        self.rating = rating.min(self.max_rating);
        self
    }

    pub fn max_rating(&self) -> u8 {
        self.max_rating
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Sets the rating; values outside 1..=max are ignored.
    pub fn click(&mut self, star: u8) -> Option<u8> {
        if star == 0 || star > self.max_rating {
            return None;
        }
        self.rating = star;
        Some(star)
    }

    pub fn hover_in(&mut self, star: u8) {
        if (1..=self.max_rating).contains(&star) {
            self.preview = star;
        }
    }

    pub fn hover_out(&mut self) {
        self.preview = 0;
    }

    fn shown(&self) -> u8 {
        if self.preview > 0 {
            self.preview
        } else {
            self.rating
        }
    }

    /// Whether star `i` (1-based) is drawn full.
    pub fn is_full(&self, star: u8) -> bool {
        self.shown() >= star
    }

    pub fn label(&self) -> String {
        let shown = self.shown();
        if self.messages.len() == self.max_rating as usize && shown > 0 {
            return self.messages[shown as usize - 1].clone();
        }
        if shown > 0 {
            shown.to_string()
        } else {
            String::new()
        }
    }

    pub fn render(&self) -> String {
        let stars: String = (1..=self.max_rating)
            .map(|i| if self.is_full(i) { '★' } else { '☆' })
            .collect();
        let label = self.label();
        if label.is_empty() {
            stars
        } else {
            format!("{} {}", stars, label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_sets_rating_within_range() {
        let mut stars = StarRating::new(5);
        assert_eq!(stars.click(3), Some(3));
        assert_eq!(stars.click(0), None);
        assert_eq!(stars.click(6), None);
        assert_eq!(stars.rating(), 3);
        assert_eq!(stars.render(), "★★★☆☆ 3");
    }

    #[test]
    fn hover_previews_without_changing_rating() {
        let mut stars = StarRating::new(5).with_default(2);
        stars.hover_in(4);
        assert!(stars.is_full(4));
        assert_eq!(stars.label(), "4");
        assert_eq!(stars.rating(), 2);
        stars.hover_out();
        assert!(!stars.is_full(3));
        assert_eq!(stars.label(), "2");
    }

    #[test]
    fn messages_used_only_when_complete() {
        let labels: Vec<String> = ["Terrible", "Bad", "Okay", "Good", "Amazing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut stars = StarRating::new(5).with_messages(labels);
        stars.click(5);
        assert_eq!(stars.label(), "Amazing");

        let mut partial = StarRating::new(5).with_messages(vec!["Bad".to_string()]);
        partial.click(1);
        assert_eq!(partial.label(), "1");
    }

    #[test]
    fn unrated_renders_empty_stars() {
        let stars = StarRating::new(3);
        assert_eq!(stars.label(), "");
        assert_eq!(stars.render(), "☆☆☆");
    }
}
