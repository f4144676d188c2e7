//! Deterministic question banks used when the question source is unavailable.

use crate::{dao::questions::QuestionRequest, state::quiz::Question};

struct BankItem {
    text: &'static str,
    options: [&'static str; 4],
    correct: usize,
}

const SCIENCE: &[BankItem] = &[
    BankItem {
        text: "What is the closest planet to the Sun?",
        options: ["Venus", "Mercury", "Earth", "Mars"],
        correct: 1,
    },
    BankItem {
        text: "Which of the following is NOT a state of matter?",
        options: ["Solid", "Liquid", "Energy", "Gas"],
        correct: 2,
    },
    BankItem {
        text: "What is the chemical formula of water?",
        options: ["CO2", "O2", "NaCl", "H2O"],
        correct: 3,
    },
    BankItem {
        text: "Which of these animals is a mammal?",
        options: ["Dolphin", "Shark", "Turtle", "Snake"],
        correct: 0,
    },
    BankItem {
        text: "What does DNA stand for?",
        options: [
            "Dual Nitrogen Atom",
            "Deoxyribonucleic Acid",
            "Digital Numeric Array",
            "Diverse Natural Arrangement",
        ],
        correct: 1,
    },
];

const HISTORY: &[BankItem] = &[
    BankItem {
        text: "In which year did World War II end?",
        options: ["1939", "1918", "1945", "1941"],
        correct: 2,
    },
    BankItem {
        text: "Who was the first president of the United States?",
        options: [
            "Thomas Jefferson",
            "George Washington",
            "Abraham Lincoln",
            "John Adams",
        ],
        correct: 1,
    },
    BankItem {
        text: "Which ancient civilization built the pyramids at Giza?",
        options: ["Egyptians", "Romans", "Greeks", "Mayans"],
        correct: 0,
    },
    BankItem {
        text: "The Renaissance began in which country?",
        options: ["France", "England", "Spain", "Italy"],
        correct: 3,
    },
    BankItem {
        text: "Which ship carried the Pilgrims to America in 1620?",
        options: ["Santa Maria", "Mayflower", "Discovery", "Victoria"],
        correct: 1,
    },
];

const GENERAL: &[BankItem] = &[
    BankItem {
        text: "Which of these countries is in Europe?",
        options: ["Japan", "Brazil", "France", "Australia"],
        correct: 2,
    },
    BankItem {
        text: "What is the largest ocean on Earth?",
        options: [
            "Pacific Ocean",
            "Atlantic Ocean",
            "Indian Ocean",
            "Arctic Ocean",
        ],
        correct: 0,
    },
    BankItem {
        text: "Who wrote 'Romeo and Juliet'?",
        options: [
            "Charles Dickens",
            "Jane Austen",
            "Leo Tolstoy",
            "William Shakespeare",
        ],
        correct: 3,
    },
    BankItem {
        text: "What is the capital of the United States?",
        options: ["New York", "Washington D.C.", "Los Angeles", "Chicago"],
        correct: 1,
    },
    BankItem {
        text: "How many sides does a hexagon have?",
        options: ["Five", "Seven", "Six", "Eight"],
        correct: 2,
    },
];

fn bank_for(topic: &str) -> &'static [BankItem] {
    let topic = topic.to_lowercase();
    if topic.contains("science") {
        SCIENCE
    } else if topic.contains("history") {
        HISTORY
    } else {
        GENERAL
    }
}

/// Build `request.count` questions from the bank matching the topic, cycling when needed.
pub fn placeholder_questions(request: &QuestionRequest) -> Vec<Question> {
    let bank = bank_for(&request.topic);
    (0..request.count)
        .map(|i| {
            let item = &bank[i % bank.len()];
            Question {
                id: format!("placeholder-q{}", i + 1),
                text: item.text.to_string(),
                options: item.options.iter().map(|option| option.to_string()).collect(),
                correct_option: item.correct,
                time_limit_secs: request.time_limit_secs,
            }
        })
        .collect()
}
