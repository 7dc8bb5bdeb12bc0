use crate::models::{Language, Situation};

pub struct Strings {
    pub title: &'static str,
    pub intro: &'static str,
    pub morning: &'static str,
    pub work: &'static str,
    pub break_time: &'static str,
    pub evening: &'static str,
    pub sleep: &'static str,
    pub next_tip: &'static str,
    pub switch_lang: &'static str,
    pub liked: &'static str,
    pub like: &'static str,
    pub play_music: &'static str,
    pub stop_music: &'static str,
    pub pick_situation: &'static str,
    pub loading: &'static str,
    pub no_tips: &'static str,
    pub load_failed: &'static str,
    pub like_failed: &'static str,
    pub already_liked: &'static str,
    pub audio_failed: &'static str,
    pub read_only: &'static str,
}

const ZH: Strings = Strings {
    title: "心灵加油站",
    intro: "选择你当前的情境，获取适合的心灵小贴士。每个练习只需30秒，帮助你在忙碌的日常中找到片刻宁静。",
    morning: "早晨起床",
    work: "工作时间",
    break_time: "休息时刻",
    evening: "晚间放松",
    sleep: "入睡前",
    next_tip: "下一条提示",
    switch_lang: "English",
    liked: "已喜欢",
    like: "喜欢",
    play_music: "播放音乐",
    stop_music: "停止音乐",
    pick_situation: "请选择一个情境。",
    loading: "加载中……",
    no_tips: "暂无提示，请稍后再试。",
    load_failed: "加载提示失败。请稍后再试。",
    like_failed: "点赞失败，请稍后重试。",
    already_liked: "你已经喜欢过这条提示了。",
    audio_failed: "播放音频失败，请检查播放器设置",
    read_only: "当前环境不允许写入数据库",
};

const EN: Strings = Strings {
    title: "Soul Refueling Station",
    intro: "Choose your current situation to get a suitable soul tip. Each exercise takes only 30 seconds, helping you find a moment of peace in your busy day.",
    morning: "Morning Wake Up",
    work: "Work Time",
    break_time: "Break Time",
    evening: "Evening Relaxation",
    sleep: "Before Sleep",
    next_tip: "Next Tip",
    switch_lang: "中文",
    liked: "Liked",
    like: "Like",
    play_music: "Play Music",
    stop_music: "Stop Music",
    pick_situation: "Pick a situation.",
    loading: "Loading...",
    no_tips: "No tips available. Please try again later.",
    load_failed: "Failed to load tips. Please try again later.",
    like_failed: "Failed to like this tip. Please try again later.",
    already_liked: "You've already liked this tip.",
    audio_failed: "Failed to play audio, check the player settings",
    read_only: "Writing to the database is not allowed here",
};

pub fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Zh => &ZH,
        Language::En => &EN,
    }
}

pub fn situation_label(language: Language, situation: Situation) -> &'static str {
    let s = strings(language);
    match situation {
        Situation::Morning => s.morning,
        Situation::Work => s.work,
        Situation::Break => s.break_time,
        Situation::Evening => s.evening,
        Situation::Sleep => s.sleep,
    }
}

/// Like button text, with the count once there is one.
pub fn like_label(language: Language, liked: bool, count: i64) -> String {
    let s = strings(language);
    let text = if liked { s.liked } else { s.like };
    if count > 0 {
        format!("{text} ({count})")
    } else {
        text.to_string()
    }
}
