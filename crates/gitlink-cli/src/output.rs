// Plain-text and JSON rendering for command results
use chrono::{DateTime, Utc};
use gitlink_core::{ProjectIdea, RepositoryListing, SubmittedRepo, UserProfile};
use serde::Serialize;

pub struct Printer {
    pub json: bool,
}

impl Printer {
    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn listings(&self, title: &str, listings: &[RepositoryListing]) -> anyhow::Result<()> {
        if self.json {
            return self.emit_json(listings);
        }

        println!("{} ({})", title, listings.len());
        if listings.is_empty() {
            println!("  nothing to show");
        }
        for listing in listings {
            print_listing(listing);
        }
        Ok(())
    }

    pub fn submissions(&self, submissions: &[SubmittedRepo]) -> anyhow::Result<()> {
        if self.json {
            return self.emit_json(submissions);
        }

        println!("Submissions ({})", submissions.len());
        for s in submissions {
            println!(
                "  [{}] {}  {} ({})",
                s.status.as_str(),
                s.id.as_deref().unwrap_or("-"),
                s.github_url.trim_start_matches("https://github.com/"),
                s.difficulty
            );
            println!("      {}", s.description);
            if !s.tech_stack.is_empty() {
                println!("      tech: {}", s.tech_stack.join(", "));
            }
            println!("      by {}", s.submitted_by.as_deref().unwrap_or("anonymous"));
        }
        Ok(())
    }

    pub fn ideas(&self, ideas: &[&ProjectIdea]) -> anyhow::Result<()> {
        if self.json {
            return self.emit_json(ideas);
        }

        for idea in ideas {
            println!("{}. {} [{}, {}]", idea.id, idea.title, idea.difficulty, idea.estimated_time);
            println!("   {}", idea.description);
            println!("   tech: {}", idea.technologies.join(", "));
            for feature in idea.features {
                println!("   - {}", feature);
            }
        }
        Ok(())
    }

    pub fn profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        if self.json {
            return self.emit_json(profile);
        }

        let login = if profile.login.is_empty() { "(no login)" } else { profile.login.as_str() };
        println!("{} <{}>", login, profile.email.as_deref().unwrap_or("no e-mail"));
        if !profile.name.is_empty() {
            println!("  name: {}", profile.name);
        }
        println!("  id:   {}", profile.id);
        Ok(())
    }

    pub fn banner(&self, api_error: Option<&str>) {
        if let Some(message) = api_error {
            eprintln!("warning: {}", message);
        }
    }

    pub fn updated(&self, at: Option<DateTime<Utc>>) {
        if !self.json {
            if let Some(at) = at {
                println!("Last updated {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
    }

    pub fn message(&self, text: &str) {
        if !self.json {
            println!("{}", text);
        }
    }
}

fn print_listing(listing: &RepositoryListing) {
    let language = listing.language.as_deref().unwrap_or("-");
    println!(
        "  {:>7} stars  {:<40} [{}]  #{}",
        listing.stars, listing.full_name, language, listing.id
    );
    if let Some(description) = listing.description.as_deref().filter(|d| !d.is_empty()) {
        println!("      {}", truncate(description, 100));
    }
    println!("      {}", listing.url);
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
