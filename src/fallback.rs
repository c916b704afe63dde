//! Hardcoded fallback payloads for the listing endpoints.
//!
//! Served when the document store is unreachable so the frontend keeps
//! rendering something sensible.  The lists mirror the seeded collections at
//! the time of writing; they are a degraded mode, not a second source of
//! truth.

use crate::store::{CategoryDescriptor, RepoDescriptor};

pub fn fallback_categories() -> Vec<CategoryDescriptor> {
    [
        ("DevOps", "#2563eb", "🚀"),
        ("Backend", "#dc2626", "⚙️"),
        ("Frontend", "#16a34a", "🎨"),
        ("Monitoring", "#ea580c", "📊"),
        ("Security", "#7c3aed", "🔒"),
        ("CMS", "#db2777", "📝"),
        ("Database", "#0891b2", "💾"),
        ("AI/ML", "#65a30d", "🤖"),
    ]
    .into_iter()
    .map(|(name, color, icon)| CategoryDescriptor {
        name: name.to_string(),
        color: color.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

pub fn fallback_repos() -> Vec<RepoDescriptor> {
    [
        ("chatwoot", "chatwoot"),
        ("coollabsio", "coolify"),
        ("CorentinTh", "it-tools"),
        ("dani-garcia", "vaultwarden"),
        ("directus", "directus"),
        ("docker-mailserver", "docker-mailserver"),
        ("docsifyjs", "docsify"),
        ("duplicati", "duplicati"),
        ("elastic", "elasticsearch"),
        ("formbricks", "formbricks"),
        ("FredrikNoren", "ungit"),
        ("huntabyte", "shadcn-svelte"),
        ("kimai", "kimai"),
        ("Lissy93", "dashy"),
        ("louislam", "uptime-kuma"),
        ("makeplane", "plane"),
        ("meilisearch", "meilisearch"),
        ("nicolargo", "glances"),
        ("paul-gauthier", "aider"),
        ("payloadcms", "payload"),
        ("pocketbase", "pocketbase"),
        ("sanity-io", "sanity"),
        ("strapi", "strapi"),
        ("sveltejs", "kit"),
        ("sveltejs", "svelte"),
        ("tailwindlabs", "tailwindcss"),
        ("twentyhq", "twenty"),
        ("umami-software", "umami"),
        ("TYPO3", "typo3"),
    ]
    .into_iter()
    .map(|(owner, repo)| RepoDescriptor {
        owner: owner.to_string(),
        repo: repo.to_string(),
        categories: Vec::new(),
        priority: 1,
        active: true,
        description: String::new(),
        last_checked: None,
    })
    .collect()
}
