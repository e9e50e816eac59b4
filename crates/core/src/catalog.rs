//! Built-in question bank.
//!
//! A handful of hand-written questions per domain, topped up with templated
//! variants until every domain reaches its default exam target.

use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashSet;

use crate::bank::{BankError, QuestionBank};
use crate::config::DomainWeights;
use crate::model::{Domain, Question, QuestionId};

struct BaseQuestion {
    domain: Domain,
    prompt: &'static str,
    options: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

const BASE_QUESTIONS: &[BaseQuestion] = &[
    BaseQuestion {
        domain: Domain::Fundamentals,
        prompt: "A project manager is assigned to a new infrastructure project. The sponsor asks for a document that formally authorizes the project. What document should the project manager create?",
        options: ["Project Management Plan", "Project Charter", "Business Case", "Stakeholder Register"],
        correct: 1,
        explanation: "The Project Charter is issued by the sponsor and formally authorizes the project.",
    },
    BaseQuestion {
        domain: Domain::Fundamentals,
        prompt: "An organization runs server upgrades, a cloud migration and staff training. Some are related, others are not. What is this collection BEST described as?",
        options: ["Program", "Portfolio", "Project", "Operations"],
        correct: 1,
        explanation: "A portfolio is a collection of projects, programs and operations managed as a group.",
    },
    BaseQuestion {
        domain: Domain::Fundamentals,
        prompt: "Which of the following is NOT an example of a project?",
        options: ["Developing new software", "Processing monthly payroll", "Constructing a bridge", "Planning a wedding"],
        correct: 1,
        explanation: "Processing monthly payroll is operational: ongoing and repetitive.",
    },
    BaseQuestion {
        domain: Domain::Fundamentals,
        prompt: "During execution, a key stakeholder requests a significant change. What should the project manager do FIRST?",
        options: ["Implement immediately", "Submit through change control", "Reject the change", "Ask the sponsor"],
        correct: 1,
        explanation: "All changes go through integrated change control so their impacts can be evaluated.",
    },
    BaseQuestion {
        domain: Domain::Fundamentals,
        prompt: "A project has a budget of $500,000 over 12 months. At month 6, $300,000 is spent with 40% complete. What is the earned value?",
        options: ["$300,000", "$200,000", "$250,000", "$500,000"],
        correct: 1,
        explanation: "EV = BAC x % complete = $500,000 x 40% = $200,000.",
    },
    BaseQuestion {
        domain: Domain::Predictive,
        prompt: "A project manager is creating the WBS for a construction project. Which is a valid decomposition rule?",
        options: ["Decompose until work packages can be estimated", "Decompose until assigned to a specific person", "Decompose all branches equally", "Decompose only the critical path"],
        correct: 0,
        explanation: "Work packages are decomposed to the level where they can be estimated and managed.",
    },
    BaseQuestion {
        domain: Domain::Predictive,
        prompt: "Activity A = 5 days, B = 3 days, C = 4 days. A and B start immediately and C depends on both. What is the critical path duration?",
        options: ["5 days", "8 days", "9 days", "12 days"],
        correct: 2,
        explanation: "The critical path is A (5) then C (4) = 9 days.",
    },
    BaseQuestion {
        domain: Domain::Predictive,
        prompt: "A project has CPI = 0.9 and SPI = 1.1. What does this indicate?",
        options: ["Over budget, behind schedule", "Under budget, ahead of schedule", "Over budget, ahead of schedule", "Under budget, behind schedule"],
        correct: 2,
        explanation: "CPI below 1 means over budget; SPI above 1 means ahead of schedule.",
    },
    BaseQuestion {
        domain: Domain::Predictive,
        prompt: "Three-point estimate: optimistic 10, pessimistic 22, most likely 16. What is the PERT expected duration?",
        options: ["15 days", "16 days", "17 days", "18 days"],
        correct: 1,
        explanation: "(10 + 4 x 16 + 22) / 6 = 96 / 6 = 16 days.",
    },
    BaseQuestion {
        domain: Domain::Agile,
        prompt: "A Scrum team is mid-Sprint when the Product Owner wants to add a new high-priority feature. What should happen?",
        options: ["Add immediately", "Wait for the next Sprint", "Replace the lowest priority item", "Ask the Scrum Master"],
        correct: 1,
        explanation: "The Sprint goal is protected; new work enters through the Product Backlog for the next Sprint.",
    },
    BaseQuestion {
        domain: Domain::Agile,
        prompt: "What is the primary purpose of the Sprint Retrospective?",
        options: ["Inspect the product", "Plan the next Sprint", "Inspect and adapt the team process", "Review the Product Backlog"],
        correct: 2,
        explanation: "The Retrospective is where the team inspects and adapts how it works.",
    },
    BaseQuestion {
        domain: Domain::Agile,
        prompt: "In Kanban, what does a WIP limit refer to?",
        options: ["Maximum team members", "Maximum work items in a workflow state", "Minimum items per day", "Total budget"],
        correct: 1,
        explanation: "WIP limits cap how many items may sit in a workflow state at once.",
    },
    BaseQuestion {
        domain: Domain::Agile,
        prompt: "A team's velocity is 30 story points per Sprint and the Product Backlog holds 120 points. How many Sprints are needed?",
        options: ["3", "4", "5", "6"],
        correct: 1,
        explanation: "120 / 30 = 4 Sprints.",
    },
    BaseQuestion {
        domain: Domain::BusinessAnalysis,
        prompt: "A business analyst watches users perform their daily work to understand requirements. This technique is called:",
        options: ["Interviewing", "Observation", "Prototyping", "Brainstorming"],
        correct: 1,
        explanation: "Observation (job shadowing) captures how work is actually done.",
    },
    BaseQuestion {
        domain: Domain::BusinessAnalysis,
        prompt: "Which is an example of a non-functional requirement?",
        options: ["Calculate payroll taxes", "Generate employee reports", "Respond within 2 seconds", "Store employee information"],
        correct: 2,
        explanation: "Response time is a quality attribute, not a function.",
    },
    BaseQuestion {
        domain: Domain::BusinessAnalysis,
        prompt: "A requirements traceability matrix is used to:",
        options: ["Track costs", "Link requirements to objectives and deliverables", "Create the schedule", "Assign requirements"],
        correct: 1,
        explanation: "Traceability links each requirement to its business objective and deliverable.",
    },
    BaseQuestion {
        domain: Domain::BusinessAnalysis,
        prompt: "A stakeholder says: 'I need the system to be user-friendly.' What is the problem with this requirement?",
        options: ["Too detailed", "Not testable or measurable", "It is a business requirement", "It is a functional requirement"],
        correct: 1,
        explanation: "'User-friendly' is subjective; requirements need to be specific and testable.",
    },
];

const TEMPLATES: &[&str] = &[
    "What is the PRIMARY purpose of {concept}?",
    "Which document contains {concept} information?",
    "The project manager is working on {concept}. Which process group is this?",
    "A key stakeholder asks about {concept}. What should the PM do FIRST?",
    "Which tool is used for {concept}?",
    "When should {concept} be performed?",
    "Who is responsible for {concept}?",
    "What is the BEST description of {concept}?",
    "During which process does {concept} occur?",
    "What is the MAIN output of {concept}?",
];

fn concepts(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Fundamentals => &[
            "the project charter",
            "stakeholder identification",
            "the WBS",
            "risk management",
            "quality planning",
            "procurement management",
            "communication planning",
            "scope verification",
            "change control",
            "lessons learned",
        ],
        Domain::Predictive => &[
            "the critical path",
            "earned value management",
            "schedule compression",
            "resource leveling",
            "bottom-up estimating",
            "parametric estimating",
            "three-point estimating",
            "Monte Carlo analysis",
            "what-if analysis",
            "the schedule baseline",
        ],
        Domain::Agile => &[
            "the Daily Scrum",
            "Sprint Planning",
            "the Product Backlog",
            "velocity",
            "the Sprint Review",
            "the Retrospective",
            "user stories",
            "story points",
            "burndown charts",
            "the Definition of Done",
        ],
        Domain::BusinessAnalysis => &[
            "requirements elicitation",
            "traceability",
            "a feasibility study",
            "solution evaluation",
            "business case development",
            "stakeholder analysis",
            "process modeling",
            "data modeling",
            "acceptance criteria",
            "requirements prioritization",
        ],
    }
}

fn documents(domain: Domain) -> [&'static str; 4] {
    match domain {
        Domain::Fundamentals => ["Project Charter", "Project Management Plan", "Requirements Documentation", "Risk Register"],
        Domain::Predictive => ["WBS", "Network Diagram", "Project Schedule", "Cost Baseline"],
        Domain::Agile => ["Product Backlog", "Sprint Backlog", "Increment", "Definition of Done"],
        Domain::BusinessAnalysis => ["Business Requirements Document", "Traceability Matrix", "Use Cases", "Acceptance Criteria"],
    }
}

fn roles(domain: Domain) -> [&'static str; 4] {
    match domain {
        Domain::Fundamentals => ["Project Manager", "Sponsor", "PMO", "Stakeholders"],
        Domain::Predictive => ["Project Manager", "Team Lead", "Functional Manager", "Sponsor"],
        Domain::Agile => ["Product Owner", "Scrum Master", "Developers", "Stakeholders"],
        Domain::BusinessAnalysis => ["Business Analyst", "Product Manager", "Subject Matter Expert", "End User"],
    }
}

const PROCESS_GROUPS: [&str; 4] = ["Initiating", "Planning", "Executing", "Monitoring and Controlling"];

/// Options for a templated question; the family follows the template wording.
fn options_for(template: &str, domain: Domain, concept: &str) -> Vec<String> {
    let lower = template.to_lowercase();
    let fixed: Option<[&str; 4]> = if lower.contains("process group") {
        Some(PROCESS_GROUPS)
    } else if lower.contains("document") {
        Some(documents(domain))
    } else if lower.contains("responsible") {
        Some(roles(domain))
    } else {
        None
    };

    match fixed {
        Some(options) => options.iter().map(|s| (*s).to_string()).collect(),
        None => vec![
            format!("Perform {concept} immediately"),
            format!("Document {concept} in the plan"),
            format!("Review {concept} with stakeholders"),
            format!("Update {concept} in the register"),
        ],
    }
}

/// Build the default 150-question bank.
///
/// Generated variants draw template, concept and correct option from `rng`,
/// so a seeded generator reproduces the same bank.
///
/// # Errors
///
/// Returns `BankError` if a generated question fails validation.
pub fn builtin_bank<R: Rng + ?Sized>(rng: &mut R) -> Result<QuestionBank, BankError> {
    builtin_bank_with_targets(&DomainWeights::default(), rng)
}

/// Build a bank holding at least `targets[d]` questions for every domain.
///
/// # Errors
///
/// Returns `BankError` if a generated question fails validation.
pub fn builtin_bank_with_targets<R: Rng + ?Sized>(
    targets: &DomainWeights,
    rng: &mut R,
) -> Result<QuestionBank, BankError> {
    let mut questions = Vec::new();
    let mut prompts: HashSet<String> = HashSet::new();
    let mut next_id = 1_u64;

    for base in BASE_QUESTIONS {
        questions.push(Question::new(
            QuestionId::new(next_id),
            base.domain,
            base.prompt,
            base.options.iter().map(|s| (*s).to_string()).collect(),
            base.correct,
            base.explanation,
        )?);
        prompts.insert(base.prompt.to_string());
        next_id += 1;
    }

    for domain in Domain::ALL {
        let target = targets.target(domain) as usize;
        let mut current = questions.iter().filter(|q| q.domain() == domain).count();
        let domain_concepts = concepts(domain);

        while current < target {
            let template = TEMPLATES.choose(rng).copied().unwrap_or(TEMPLATES[0]);
            let concept = domain_concepts
                .choose(rng)
                .copied()
                .unwrap_or(domain_concepts[0]);

            let mut prompt = template.replace("{concept}", concept);
            if prompts.contains(&prompt) {
                prompt = format!("According to PMBOK, {}", lowercase_first(&prompt));
            }
            if prompts.contains(&prompt) {
                prompt = format!("{prompt} (variant {next_id})");
            }

            let options = options_for(template, domain, concept);
            let correct = rng.random_range(0..options.len());
            let explanation = format!(
                "This tests understanding of {concept} in {}. The correct answer is {}.",
                domain.label(),
                options[correct]
            );

            prompts.insert(prompt.clone());
            questions.push(Question::new(
                QuestionId::new(next_id),
                domain,
                prompt,
                options,
                correct,
                explanation,
            )?);
            next_id += 1;
            current += 1;
        }
    }

    QuestionBank::new(questions)
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
