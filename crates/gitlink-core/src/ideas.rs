// Starter project ideas shown on the ideas view
use serde::Serialize;

use crate::models::Difficulty;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectIdea {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
    pub technologies: &'static [&'static str],
    pub estimated_time: &'static str,
    pub features: &'static [&'static str],
}

const IDEAS: &[ProjectIdea] = &[
    ProjectIdea {
        id: "1",
        title: "Todo List App",
        description: "A simple task management application with add, edit, delete, and mark complete functionality.",
        difficulty: Difficulty::Beginner,
        technologies: &["HTML", "CSS", "JavaScript", "React"],
        estimated_time: "1-2 days",
        features: &[
            "Add new tasks",
            "Mark tasks as complete",
            "Delete tasks",
            "Filter by status",
            "Local storage persistence",
        ],
    },
    ProjectIdea {
        id: "2",
        title: "Weather App",
        description: "Display current weather and 5-day forecast using a weather API.",
        difficulty: Difficulty::Beginner,
        technologies: &["HTML", "CSS", "JavaScript", "API Integration"],
        estimated_time: "2-3 days",
        features: &[
            "Current weather display",
            "Search by city",
            "5-day forecast",
            "Weather icons",
            "Responsive design",
        ],
    },
    ProjectIdea {
        id: "3",
        title: "Calculator App",
        description: "A functional calculator with basic arithmetic operations and a clean interface.",
        difficulty: Difficulty::Beginner,
        technologies: &["HTML", "CSS", "JavaScript"],
        estimated_time: "1 day",
        features: &[
            "Basic arithmetic operations",
            "Clear and delete functions",
            "Keyboard support",
            "Memory functions",
            "Responsive design",
        ],
    },
    ProjectIdea {
        id: "4",
        title: "Personal Portfolio Website",
        description: "Showcase your projects, skills, and experience with a professional portfolio.",
        difficulty: Difficulty::Beginner,
        technologies: &["HTML", "CSS", "JavaScript", "React"],
        estimated_time: "3-5 days",
        features: &[
            "About me section",
            "Projects showcase",
            "Skills and experience",
            "Contact form",
            "Responsive design",
        ],
    },
    ProjectIdea {
        id: "5",
        title: "Quiz Application",
        description: "Interactive quiz app with multiple choice questions and score tracking.",
        difficulty: Difficulty::Intermediate,
        technologies: &["React", "JavaScript", "CSS", "JSON"],
        estimated_time: "3-4 days",
        features: &[
            "Multiple choice questions",
            "Score tracking",
            "Timer functionality",
            "Results summary",
            "Question categories",
        ],
    },
    ProjectIdea {
        id: "6",
        title: "Recipe Finder",
        description: "Search and discover recipes using a food API with ingredients and instructions.",
        difficulty: Difficulty::Intermediate,
        technologies: &["React", "API Integration", "CSS", "JavaScript"],
        estimated_time: "4-5 days",
        features: &[
            "Recipe search",
            "Ingredient lists",
            "Cooking instructions",
            "Nutritional information",
            "Favorite recipes",
        ],
    },
    ProjectIdea {
        id: "7",
        title: "Expense Tracker",
        description: "Track income and expenses with categories, charts, and budget management.",
        difficulty: Difficulty::Intermediate,
        technologies: &["React", "Charts.js", "Local Storage", "CSS"],
        estimated_time: "5-7 days",
        features: &[
            "Add income/expenses",
            "Category management",
            "Visual charts",
            "Budget tracking",
            "Export data",
        ],
    },
    ProjectIdea {
        id: "8",
        title: "Chat Application",
        description: "Real-time chat app with multiple rooms and user authentication.",
        difficulty: Difficulty::Advanced,
        technologies: &["React", "Socket.io", "Node.js", "MongoDB"],
        estimated_time: "1-2 weeks",
        features: &[
            "Real-time messaging",
            "Multiple chat rooms",
            "User authentication",
            "File sharing",
            "Online status",
        ],
    },
];

pub fn project_ideas() -> &'static [ProjectIdea] {
    IDEAS
}

/// Ideas of one difficulty, or all of them
pub fn ideas_for(difficulty: Option<Difficulty>) -> Vec<&'static ProjectIdea> {
    IDEAS
        .iter()
        .filter(|idea| difficulty.map_or(true, |d| idea.difficulty == d))
        .collect()
}
