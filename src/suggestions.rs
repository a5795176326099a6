//! Canned starter questions, grouped the way the landing page shows them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    HeadToHead,
    Historical,
    Statistics,
    Analysis,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::HeadToHead,
        Category::Historical,
        Category::Statistics,
        Category::Analysis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::HeadToHead => "Head-to-Head",
            Category::Historical => "Historical",
            Category::Statistics => "Statistics",
            Category::Analysis => "Analysis",
        }
    }

    /// Case-insensitive lookup by display name; `h2h` also works.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        if lower == "h2h" {
            return Some(Category::HeadToHead);
        }
        Self::ALL
            .into_iter()
            .find(|category| category.name().to_ascii_lowercase() == lower)
    }

    pub fn questions(self) -> &'static [&'static str] {
        match self {
            Category::HeadToHead => &[
                "Compare Nadal and Federer's performance on clay courts from 2005-2010",
                "What's the head-to-head record between Djokovic and Murray at Grand Slams?",
                "Show me matches where Federer beat Nadal on grass",
            ],
            Category::Historical => &[
                "When did Federer first reach World No. 1?",
                "Which era had the most competitive matches?",
                "Has the average match duration changed since 2000?",
            ],
            Category::Statistics => &[
                "What's the average number of tiebreaks in Wimbledon finals?",
                "Who are the top 5 performers at the Australian Open in the last decade?",
                "Which surface has produced the most five-set matches?",
            ],
            Category::Analysis => &[
                "Analyze the 2008 Wimbledon final between Federer and Nadal",
                "What were the key statistics in the 2019 US Open final?",
                "Show me the closest matches between Djokovic and Nadal",
            ],
        }
    }
}
