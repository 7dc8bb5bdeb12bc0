//! Built-in tips shown when the backend has nothing to offer.

use crate::models::{Language, NewTip, Situation, TipCollection, TipEntry};

const DEFAULT_TIPS: [(Situation, Language, [&str; 2]); 10] = [
    (
        Situation::Morning,
        Language::Zh,
        ["深呼吸，感受清晨的空气。", "花一分钟时间，感恩你所拥有的一切。"],
    ),
    (
        Situation::Morning,
        Language::En,
        [
            "Take a deep breath, feel the morning air.",
            "Take a moment to be grateful for what you have.",
        ],
    ),
    (
        Situation::Work,
        Language::Zh,
        ["闭上眼睛，专注于你的呼吸，持续30秒。", "站起来，做一些简单的伸展运动。"],
    ),
    (
        Situation::Work,
        Language::En,
        [
            "Close your eyes, focus on your breath for 30 seconds.",
            "Stand up and do some simple stretches.",
        ],
    ),
    (
        Situation::Break,
        Language::Zh,
        ["找一个安静的地方，闭上眼睛休息一下。", "听一首你喜欢的歌曲，放松心情。"],
    ),
    (
        Situation::Break,
        Language::En,
        [
            "Find a quiet place and close your eyes to rest.",
            "Listen to a song you like to relax your mind.",
        ],
    ),
    (
        Situation::Evening,
        Language::Zh,
        ["写下今天让你感到快乐的三件事。", "与家人或朋友聊聊天，分享你的感受。"],
    ),
    (
        Situation::Evening,
        Language::En,
        [
            "Write down three things that made you happy today.",
            "Chat with family or friends, share your feelings.",
        ],
    ),
    (
        Situation::Sleep,
        Language::Zh,
        ["进行几次深呼吸，放松全身。", "想象一个宁静的场景，帮助入睡。"],
    ),
    (
        Situation::Sleep,
        Language::En,
        [
            "Take a few deep breaths, relax your body.",
            "Imagine a peaceful scene to help you fall asleep.",
        ],
    ),
];

/// Ids follow the `<situation>_<language>_<n>` pattern, starting at 1.
pub fn default_new_tips() -> Vec<NewTip> {
    DEFAULT_TIPS
        .iter()
        .flat_map(|(situation, language, contents)| {
            contents.iter().enumerate().map(move |(i, content)| NewTip {
                id: format!("{}_{}_{}", situation.as_str(), language.as_str(), i + 1),
                situation: *situation,
                language: *language,
                content: content.to_string(),
            })
        })
        .collect()
}

pub fn default_tips() -> TipCollection {
    let mut tips = TipCollection::new();
    for tip in default_new_tips() {
        tips.push(
            tip.situation,
            tip.language,
            TipEntry {
                id: tip.id,
                content: tip.content,
                display_count: 0,
                likes: 0,
            },
        );
    }
    tips
}
