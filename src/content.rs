//! Static report copy: domain layout and the per-stage narrative tables.

use crate::scores::{ScoreKey, Stage};
use serde::Serialize;

/// The four top-level readiness domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Discipleship,
    Sending,
    Support,
    Structure,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Discipleship,
        Domain::Sending,
        Domain::Support,
        Domain::Structure,
    ];

    /// Score key holding the domain's own raw score.
    pub fn score_key(self) -> ScoreKey {
        match self {
            Domain::Discipleship => ScoreKey::Discipleship,
            Domain::Sending => ScoreKey::Sending,
            Domain::Support => ScoreKey::Support,
            Domain::Structure => ScoreKey::Structure,
        }
    }

    pub fn sub_domains(self) -> &'static [ScoreKey] {
        match self {
            Domain::Discipleship => &[ScoreKey::Education, ScoreKey::Training],
            Domain::Sending => &[ScoreKey::Sending1, ScoreKey::Membercare],
            Domain::Support => &[ScoreKey::Praying, ScoreKey::Giving, ScoreKey::Community],
            Domain::Structure => &[
                ScoreKey::Organisation,
                ScoreKey::Policies,
                ScoreKey::Partnerships,
            ],
        }
    }

    pub fn display_name(self) -> &'static str {
        self.score_key().display_name()
    }

    /// One line describing what the domain measures.
    pub fn description(self) -> &'static str {
        match self {
            Domain::Discipleship => {
                "How missions shapes teaching, worship and the equipping of members."
            }
            Domain::Sending => "How the church identifies, sends and cares for its missionaries.",
            Domain::Support => "How prayer, giving and community sustain missions engagement.",
            Domain::Structure => {
                "How leadership, policies and partnerships carry missions long term."
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Narrative copy for one sub-domain at one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageText {
    pub summary_insight: &'static str,
    pub next_step: &'static str,
}

/// Summary insight for a domain at the given stage.
pub fn domain_insight(domain: Domain, stage: Stage) -> &'static str {
    DOMAIN_INSIGHTS[domain.index()][stage.index()]
}

/// Summary insight and next step for a sub-domain. Returns `None` for the
/// four domain-level keys, which have no sub-domain copy.
pub fn sub_domain_text(key: ScoreKey, stage: Stage) -> Option<StageText> {
    let row = match key {
        ScoreKey::Education => 0,
        ScoreKey::Training => 1,
        ScoreKey::Sending1 => 2,
        ScoreKey::Membercare => 3,
        ScoreKey::Praying => 4,
        ScoreKey::Giving => 5,
        ScoreKey::Community => 6,
        ScoreKey::Organisation => 7,
        ScoreKey::Policies => 8,
        ScoreKey::Partnerships => 9,
        ScoreKey::Discipleship | ScoreKey::Sending | ScoreKey::Support | ScoreKey::Structure => {
            return None
        }
    };
    Some(SUBDOMAIN_TEXT[row][stage.index()])
}

pub const REPORT_TITLE: &str = "Church Missions Readiness Report";
pub const ASSESSMENT_NAME: &str =
    "Based on the Antioch21 Church Missions Readiness Assessment (CMRA)";

pub const EXECUTIVE_SUMMARY_INTRO: &str = "This report summarises how your church responded to the \
CMRA across four domains: Discipleship, Sending, Support and Structure. Each domain and sub-domain \
is placed on one of five stages, from Unengaged to Multiplying. The stages describe where your \
church is today; they are not a grade. Use the strengths below as a foundation and the growth \
areas as a starting point for conversation with your leadership.";

pub const REFLECTION_PROMPTS: [&str; 5] = [
    "Which result surprised you the most, and why?",
    "Where do your strengths give you a foundation to build on in the next 12 months?",
    "Which one growth area would make the biggest difference if you addressed it first?",
    "Who in your church should see this report, and how will you share it with them?",
    "What is one next step you can commit to before the end of this quarter?",
];

pub const CLOSING_NOTE: &str = "If others in your church also completed the CMRA, compare your \
reports together. If you would like to process your results or explore ways to grow in missions \
readiness, reach out to Antioch21 at admin@antioch21.sg.";

pub const EMAIL_SUBJECT: &str =
    "Your CMRA Report - A Snapshot of Your Church's Missions Readiness";

pub const EMAIL_ATTACHMENT_NAME: &str = "CMRA_Report.pdf";

pub const EMAIL_PLAIN_BODY: &str = "Greetings from Antioch21! If you are seeing this, the email's \
full message failed to load. Please refer to further details in your CMRA Report attached.";

pub const EMAIL_HTML_BODY: &str = r#"<html>
<body>
    <p>Greetings from Antioch21!<br><br>
    Thank you for completing the Church Missions Readiness Assessment (CMRA). Attached is your individualized report with your overall readiness score and detailed insights for each domain.<br><br>
    Inside, you'll find suggested next steps, space for reflection, and prompts to guide discussion with your church leadership or fellow participants. We encourage you to share and compare your reports if others in your church also completed the CMRA.<br><br>
    If you'd like to process your results or explore ways to grow in missions readiness, we'd be glad to connect - just reach out at <a href="mailto:admin@antioch21.sg">admin@antioch21.sg</a>.<br><br>
    Warm regards,<br>
    Darrell Ong<br>
    Director Of Partnerships<br>
    Antioch21
    </p>
</body>
</html>
"#;

const DOMAIN_INSIGHTS: [[&str; 5]; 4] = [
    // discipleship
    [
        "Missions is not yet a visible or structured part of your church’s discipleship life.",
        "There is growing awareness of missions, but discipleship and training remain exploratory.",
        "Missions is present in teaching and discipleship, with early efforts at integration.",
        "Missions is actively taught and supported with structured equipping.",
        "Missions is deeply embedded into your church’s discipleship culture and training systems.",
    ],
    // sending
    [
        "Sending has not yet begun and there are no systems or awareness in place.",
        "Interest is growing, and some individuals are exploring missions.",
        "Short- and mid-term sending is happening ad-hoc or informally.",
        "Sending systems are established and supported by leadership.",
        "Sending is strategic, proactive, and part of your church's long-term vision.",
    ],
    // support
    [
        "Missions support (prayer, giving, community) is minimal and not prioritised.",
        "Giving and praying are starting to be encouraged, but inconsistently.",
        "A culture of generosity and prayer is growing. Community life is forming.",
        "Support systems are strong and mission-focused.",
        "Your church embodies a culture of missional generosity and prayerful support.",
    ],
    // structure
    [
        "There is no missions leadership structure, policies, or partnerships.",
        "Leaders are beginning to engage missions ideas and explore structures.",
        "Some leadership structures or committees are forming.",
        "Missions governance, policies, and partnerships are stabilising.",
        "A strong, resourced missions structure supports long-term effectiveness.",
    ],
];

const SUBDOMAIN_TEXT: [[StageText; 5]; 10] = [
    // education
    [
        StageText {
            summary_insight: "Missions is rarely visible in your worship or discipleship settings.",
            next_step: "Introduce quarterly missions-focused elements in worship (e.g. prayer, stories, short messages). Use these to gently shape awareness and engagement.",
        },
        StageText {
            summary_insight: "Missions appears occasionally and is beginning to gain traction.",
            next_step: "Schedule bi-monthly prayer for nations or mission updates. Encourage your teaching team to reference missions themes from Scripture.",
        },
        StageText {
            summary_insight: "Missions is gaining a foothold in pulpit and discipleship settings.",
            next_step: "Build a rhythm: e.g., preach a missions series yearly and integrate prayer for nations in cell groups.",
        },
        StageText {
            summary_insight: "Missions is featured regularly across discipleship platforms.",
            next_step: "Develop curated resources for cell leaders and teachers to reinforce missions themes consistently.",
        },
        StageText {
            summary_insight: "Missions is central to spiritual formation across your church.",
            next_step: "Engage with leaders in other churches by sharing how you’ve integrated missions into your worship life and disciple-making process.",
        },
    ],
    // training
    [
        StageText {
            summary_insight: "No structured missions training is available currently.",
            next_step: "Recommend external courses (e.g. Kairos, Perspectives) to interested members. Identify 1 to 2 potential trainers in your church.",
        },
        StageText {
            summary_insight: "Leaders refer members to training opportunities externally.",
            next_step: "Invite a missions trainer to conduct an intro workshop in-house. Capture feedback and gauge readiness to scale up.",
        },
        StageText {
            summary_insight: "Training efforts are emerging, with in-house ideas forming.",
            next_step: "Pilot a short-term training module (e.g., 3–4 weeks) and align with your next mission trip or event.",
        },
        StageText {
            summary_insight: "You have a structured training system, and candidates are being equipped.",
            next_step: "Ensure your pipeline includes mentorship and exposure trips. Consider adding modules on tentmaking or Business-as-missions.",
        },
        StageText {
            summary_insight: "You actively train and disciple members toward long-term missions.",
            next_step: "Share your training resources with others. Explore collaborations with seminaries or regional partners.",
        },
    ],
    // sending1
    [
        StageText {
            summary_insight: "Your church has not begun sending members cross-culturally.",
            next_step: "Build awareness by inviting missionary speakers and running vision nights. Consider joining another church’s team for a first exposure trip.",
        },
        StageText {
            summary_insight: "Some members are exploring missions independently.",
            next_step: "Create a basic pathway document outlining options for ST/MT/LT sending and how your church can support.",
        },
        StageText {
            summary_insight: "You are sending teams or individuals on an ad-hoc basis.",
            next_step: "Start tracking sending activity. Partner with agencies for training and supervision.",
        },
        StageText {
            summary_insight: "A regular sending rhythm and policy are in place.",
            next_step: "Set clear sending goals (e.g., 1 ST team per year). Equip pastoral staff to oversee preparation and re-entry.",
        },
        StageText {
            summary_insight: "Your church has an active strategy to identify and send missionaries.",
            next_step: "Multiply efforts into new demographics (e.g. youth, retirees). Explore collaborative cross-church sending models.",
        },
    ],
    // membercare
    [
        StageText {
            summary_insight: "There is currently no structure for missionary care.",
            next_step: "Begin pastoral check-ins with missionaries (past or present). Signal care through small acts like sending updates and prayer.",
        },
        StageText {
            summary_insight: "Some informal care is present but lacks structure.",
            next_step: "Form a care team and assign each missionary a point person. Provide updates to the wider church.",
        },
        StageText {
            summary_insight: "Church leaders are beginning to provide intentional care.",
            next_step: "Develop basic policies for care before, during, and after field deployment. Include families in the care plan.",
        },
        StageText {
            summary_insight: "Care teams are active, and systems are developing.",
            next_step: "Train care teams in topics like burnout, re-entry and trauma. Explore partnerships with member care agencies.",
        },
        StageText {
            summary_insight: "Member care is holistic and integrated across your church.",
            next_step: "Document your model and support other churches seeking to develop similar care frameworks.",
        },
    ],
    // praying
    [
        StageText {
            summary_insight: "Missions prayer is almost absent from services or meetings.",
            next_step: "Introduce a monthly “prayer for the nations” segment during service. Use global prayer tools (e.g. Operation World).",
        },
        StageText {
            summary_insight: "Some prayer for missions is present but infrequent.",
            next_step: "Schedule a quarterly prayer night for missions. Share prayer points from missionaries and agencies.",
        },
        StageText {
            summary_insight: "Missions prayer occurs regularly e.g. monthly in meetings.",
            next_step: "Encourage cell groups to “adopt” a nation or missionary to pray for regularly.",
        },
        StageText {
            summary_insight: "Missions prayer is strategic and frequent.",
            next_step: "Develop seasonal prayer themes (e.g., Ramadan, persecuted church) and empower prayer leaders to lead intercession.",
        },
        StageText {
            summary_insight: "Prayer for missions is deeply integrated into your church life.",
            next_step: "Start a missions prayer network or WhatsApp broadcast to mobilise wider participation. Train new leaders.",
        },
    ],
    // giving
    [
        StageText {
            summary_insight: "Missions giving is not prioritised in your budget or teaching.",
            next_step: "Start by setting aside a small fixed % (e.g. 5–10%) for missions. Communicate why this matters biblically.",
        },
        StageText {
            summary_insight: "Missions giving happens occasionally for special appeals.",
            next_step: "Launch a missions faith pledge campaign or giving drive to increase regular support.",
        },
        StageText {
            summary_insight: "Teaching on generosity for missions is beginning to take root.",
            next_step: "Teach on sacrificial generosity during missions emphasis months. Provide giving updates to the church.",
        },
        StageText {
            summary_insight: "Missions giving is consistent and encouraged.",
            next_step: "Review giving policies to ensure sustainability and avoid dependency.",
        },
        StageText {
            summary_insight: "Your church has a healthy and generous missions giving culture.",
            next_step: "Share your giving model with other churches and encourage collaboration in funding large-scale efforts.",
        },
    ],
    // community
    [
        StageText {
            summary_insight: "There is no identifiable missions community in your church.",
            next_step: "Identify members with a heart for missions and start gathering quarterly to pray and share.",
        },
        StageText {
            summary_insight: "A small group is forming, usually informal.",
            next_step: "Empower a leader to convene gatherings and liaise with the church leadership.",
        },
        StageText {
            summary_insight: "The missions community is growing and meeting regularly.",
            next_step: "Involve the missions community in planning events, prayer nights, or ST trips.",
        },
        StageText {
            summary_insight: "A strong and engaged missions community is in place.",
            next_step: "Launch a mentoring program pairing senior missions advocates with new members.",
        },
        StageText {
            summary_insight: "The missions community is active, reproducing, and outward-facing.",
            next_step: "Multiply this group’s impact by catalysing missions engagement across ministries and demographics.",
        },
    ],
    // organisation
    [
        StageText {
            summary_insight: "Missions is not yet prioritised by leadership or staffing.",
            next_step: "Share your CMRA results with senior leadership and begin regular conversations about church vision for missions.",
        },
        StageText {
            summary_insight: "A few leaders are beginning to engage in missions.",
            next_step: "Identify a point person for missions within staff or board. Begin forming a working committee.",
        },
        StageText {
            summary_insight: "You have early structures like a staff contact or committee.",
            next_step: "Clarify the role of your committee and draft a basic charter or ministry mandate.",
        },
        StageText {
            summary_insight: "Leadership teams and staff are engaged and active.",
            next_step: "Consider succession planning and developing a training pathway for new leaders.",
        },
        StageText {
            summary_insight: "Missions is fully owned at the leadership level.",
            next_step: "Share your model with other churches. Multiply missions leadership into youth and other departments.",
        },
    ],
    // policies
    [
        StageText {
            summary_insight: "No missions-related policies are in place.",
            next_step: "Begin drafting a missions philosophy statement and a short-term trips policy template.",
        },
        StageText {
            summary_insight: "Basic conversations are underway around policies.",
            next_step: "Research other churches’ policies for LT sending and adapt to your context.",
        },
        StageText {
            summary_insight: "Working policies are present but may be outdated.",
            next_step: "Review and revise existing policies. Involve sent missionaries in feedback.",
        },
        StageText {
            summary_insight: "Policies are robust and regularly updated.",
            next_step: "Add specialised frameworks for tentmaking, Business-as-missions, or bi-vocational sending.",
        },
        StageText {
            summary_insight: "You have comprehensive and forward-looking missions policies.",
            next_step: "Document and share your policies through denominational or network platforms.",
        },
    ],
    // partnerships
    [
        StageText {
            summary_insight: "Your church currently has no missions partnerships.",
            next_step: "Identify one reputable agency or church to begin conversations with.",
        },
        StageText {
            summary_insight: "You’re starting to build relationships with agencies.",
            next_step: "Formalise your first partnership — e.g. agree on a sending or training collaboration.",
        },
        StageText {
            summary_insight: "You have working relationships that support church missions.",
            next_step: "Evaluate partnership outcomes annually and ensure mutual value.",
        },
        StageText {
            summary_insight: "Partnerships are healthy, productive, and missionally aligned.",
            next_step: "Consider expanding your footprint by investing in new regions or church networks.",
        },
        StageText {
            summary_insight: "Your partnerships are strategic and catalytic.",
            next_step: "Collaborate with other churches for regional missions strategies and joint sending efforts.",
        },
    ],
];
