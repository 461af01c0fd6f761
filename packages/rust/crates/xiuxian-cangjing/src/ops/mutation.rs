//! Write-through edits. Every mutation writes the file atomically, re-derives
//! the touched notes immediately and clears the caches through the revision bump.

use std::collections::HashMap;
use std::fs;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Engine;
use crate::error::{VaultError, VaultResult};
use crate::graph::{XREF_RELATION, dangling_refs, field_relation};
use crate::note::parser::{
    clean_relative, ensure_note_extension, folder_of, parse_frontmatter_block, render_frontmatter,
    replace_frontmatter, rewrite_markdown_links, rewrite_wikilinks, split_frontmatter, stem_of, strip_wikilinks,
    trim_note_extension,
};
use crate::note::resolve::{MAX_SUGGESTIONS, suggest};
use crate::note::{IndexOutcome, MatchKind, clean_reference};
use crate::persist::atomic_write_text;

/// Heading that receives body links added by `link`.
pub const LINKS_HEADING: &str = "Links";
const SHORT_ID_LEN: usize = 8;
const MAX_SLUG_CHARS: usize = 80;
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Outcome of a single-note edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationReport {
    /// Edited note.
    pub path: String,
    /// Reindex result.
    pub outcome: IndexOutcome,
    /// Links, fields or lines changed.
    pub changes: usize,
    /// Revision after the edit.
    pub revision: u64,
}

/// Outcome of `move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Old path.
    pub from: String,
    /// New path.
    pub to: String,
    /// Notes whose links were rewritten.
    pub rewritten: Vec<String>,
    /// Total links rewritten.
    pub links_rewritten: usize,
    /// Relative markdown links in the moved note re-pointed from its new folder.
    pub rebased_links: usize,
    /// Revision after the move.
    pub revision: u64,
}

/// Outcome of `delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Removed note.
    pub path: String,
    /// Notes that still link to the removed path.
    pub dangling_sources: Vec<String>,
    /// Revision after the delete.
    pub revision: u64,
}

/// A reference rewritten by `repair-links`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairedLink {
    /// Linking note.
    pub source: String,
    /// Broken target text.
    pub from: String,
    /// Note it now points at.
    pub to: String,
}

/// A reference `repair-links` could not fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedLink {
    /// Linking note.
    pub source: String,
    /// Broken target text.
    pub target: String,
    /// Relation carried.
    pub relation: String,
    /// Candidates; repair needs exactly one.
    pub suggestions: Vec<String>,
}

/// Outcome of `repair-links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Fixed references.
    pub repaired: Vec<RepairedLink>,
    /// References left as they were.
    pub unresolved: Vec<UnresolvedLink>,
    /// Nothing was written.
    pub dry_run: bool,
    /// Revision after the repair.
    pub revision: u64,
}

fn heading_of(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|ch| *ch == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim()))
}

/// Insert `text` at the end of the section titled `heading`, creating a
/// level-two section at the end of the note when it is missing. Headings
/// inside fenced code blocks are ignored.
#[must_use]
pub fn append_under_heading(content: &str, heading: &str, text: &str) -> String {
    let name = heading.trim().trim_start_matches('#').trim();
    let text = text.trim_end_matches('\n');
    let (_, body) = split_frontmatter(content);
    let prefix = &content[..content.len() - body.len()];
    let lines: Vec<&str> = body.lines().collect();

    let mut in_fence = false;
    let mut section: Option<(usize, usize)> = None;
    let mut end = lines.len();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some((level, title)) = heading_of(line) else {
            continue;
        };
        match section {
            None if title.eq_ignore_ascii_case(name) => section = Some((idx, level)),
            Some((_, open_level)) if level <= open_level => {
                end = idx;
                break;
            }
            _ => {}
        }
    }

    let Some((heading_idx, _)) = section else {
        let mut out = content.trim_end().to_string();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("## {name}\n\n{text}\n"));
        return out;
    };

    let mut insert_at = end;
    while insert_at > heading_idx + 1 && lines[insert_at - 1].trim().is_empty() {
        insert_at -= 1;
    }
    let mut out: Vec<&str> = lines[..insert_at].to_vec();
    if insert_at == heading_idx + 1 {
        out.push("");
    }
    out.extend(text.lines());
    if end < lines.len() {
        out.push("");
        out.extend(&lines[end..]);
    }
    format!("{prefix}{}\n", out.join("\n"))
}

fn frontmatter_of(content: &str) -> Map<String, Value> {
    split_frontmatter(content)
        .0
        .map(parse_frontmatter_block)
        .unwrap_or_default()
}

fn field_key(fields: &Map<String, Value>, field: &str) -> String {
    fields
        .keys()
        .find(|key| key.eq_ignore_ascii_case(field))
        .cloned()
        .unwrap_or_else(|| field.to_string())
}

fn add_field_link(fields: &mut Map<String, Value>, field: &str, wikilink: &str) {
    let key = field_key(fields, field);
    let link = Value::String(wikilink.to_string());
    let next = match fields.remove(&key) {
        Some(Value::Array(mut items)) => {
            items.push(link);
            Value::Array(items)
        }
        Some(Value::String(existing)) if !existing.trim().is_empty() => {
            Value::Array(vec![Value::String(existing), link])
        }
        _ => Value::Array(vec![link]),
    };
    fields.insert(key, next);
}

fn relation_field(relation: Option<&str>) -> Option<String> {
    relation
        .map(|raw| raw.trim().trim_start_matches("field:").trim().to_lowercase())
        .filter(|field| !field.is_empty() && field != XREF_RELATION)
}

fn new_short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..SHORT_ID_LEN].to_string()
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').chars().take(MAX_SLUG_CHARS).collect()
}

fn join_folder(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

impl Engine {
    /// Text to put inside `[[...]]` for `path`: the stem when unique, else the extensionless path.
    fn link_text(&self, path: &str) -> String {
        let stem = stem_of(path);
        if self.store.lookup().paths_with_stem(&stem).len() <= 1 {
            stem
        } else {
            trim_note_extension(path).to_string()
        }
    }

    fn unique_note_path(&self, folder: &str, stem: &str) -> VaultResult<String> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = if attempt == 1 {
                stem.to_string()
            } else {
                format!("{stem}-{attempt}")
            };
            let rel = clean_relative(&ensure_note_extension(&join_folder(folder, &name)))?;
            if self.store.get(&rel).is_none() && !self.store.absolute_path(&rel)?.exists() {
                return Ok(rel);
            }
        }
        Err(VaultError::invalid(format!("no free file name for {stem}")))
    }

    fn report(&self, path: String, outcome: IndexOutcome, changes: usize) -> MutationReport {
        MutationReport {
            path,
            outcome,
            changes,
            revision: self.store.revision(),
        }
    }

    /// Create or replace a note.
    ///
    /// # Errors
    /// Returns `PathEscapesRoot` for paths outside the vault and `InvalidInput`
    /// when `create_only` is set and the note exists.
    pub fn write(&mut self, path: &str, content: &str, create_only: bool) -> VaultResult<MutationReport> {
        let rel = ensure_note_extension(&self.store.relative_path(path)?);
        let rel = self.store.canonical_path(&rel)?;
        if create_only && self.store.absolute_path(&rel)?.exists() {
            return Err(VaultError::invalid(format!("{rel} already exists")));
        }
        let outcome = self.write_through(&rel, content)?;
        Ok(self.report(rel, outcome, 1))
    }

    /// Append text at the end of a section.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes and `InvalidInput` for an empty heading.
    pub fn append_under_heading(&mut self, note: &str, heading: &str, text: &str) -> VaultResult<MutationReport> {
        if heading.trim().trim_start_matches('#').trim().is_empty() {
            return Err(VaultError::invalid("heading must not be empty"));
        }
        let path = self.store.require(note)?.path.clone();
        let content = self.read_note(&path)?;
        let updated = append_under_heading(&content, heading, text);
        let outcome = self.write_through(&path, &updated)?;
        Ok(self.report(path, outcome, 1))
    }

    /// Link `from` to `to`, as a body list item under the links heading or
    /// inside a front matter field when `relation` names one.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes and `InvalidInput` for self-links.
    pub fn link(&mut self, from: &str, to: &str, relation: Option<&str>) -> VaultResult<MutationReport> {
        let source = self.store.require(from)?.path.clone();
        let target = self.store.require(to)?.path.clone();
        if source == target {
            return Err(VaultError::invalid("cannot link a note to itself"));
        }
        let field = relation_field(relation);
        let wanted = field.as_deref().map_or_else(|| XREF_RELATION.to_string(), field_relation);
        let exists = self
            .link_graph()
            .outgoing(&source)
            .iter()
            .any(|edge| edge.target == target && edge.relation == wanted);
        if exists {
            return Ok(self.report(source, IndexOutcome::Unchanged, 0));
        }

        let wikilink = format!("[[{}]]", self.link_text(&target));
        let content = self.read_note(&source)?;
        let updated = match &field {
            None => append_under_heading(&content, LINKS_HEADING, &format!("- {wikilink}")),
            Some(field) => {
                let mut fields = frontmatter_of(&content);
                add_field_link(&mut fields, field, &wikilink);
                replace_frontmatter(&content, &fields)
            }
        };
        let outcome = self.write_through(&source, &updated)?;
        Ok(self.report(source, outcome, 1))
    }

    /// Remove references from `from` to `to`. Without a relation both body
    /// links and front matter links are removed; `xref` limits it to the body
    /// and a field name to that field.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes.
    pub fn unlink(&mut self, from: &str, to: &str, relation: Option<&str>) -> VaultResult<MutationReport> {
        let source = self.store.require(from)?.path.clone();
        let target = self.store.require(to)?.path.clone();
        let field = relation_field(relation);
        let body_only = relation.is_some_and(|raw| raw.trim().eq_ignore_ascii_case(XREF_RELATION));
        let content = self.read_note(&source)?;

        let (updated, changes) = {
            let lookup = self.store.lookup();
            let points_at_target = |raw: &str| {
                lookup
                    .resolve_exact(raw)
                    .is_some_and(|(path, _)| path == target)
            };
            let (block, body) = split_frontmatter(&content);
            let prefix = &content[..content.len() - body.len()];
            let (new_body, mut changes) = if field.is_none() {
                strip_wikilinks(body, &points_at_target)
            } else {
                (body.to_string(), 0)
            };

            let mut fields = block.map(parse_frontmatter_block).unwrap_or_default();
            let mut fields_changed = false;
            if !body_only {
                let keys: Vec<String> = fields
                    .keys()
                    .filter(|key| field.as_ref().is_none_or(|wanted| key.eq_ignore_ascii_case(wanted)))
                    .cloned()
                    .collect();
                let is_link = |value: &Value| {
                    value
                        .as_str()
                        .is_some_and(|text| text.contains("[[") && points_at_target(text))
                };
                for key in keys {
                    let Some(value) = fields.get_mut(&key) else {
                        continue;
                    };
                    if let Value::Array(items) = value {
                        let before = items.len();
                        items.retain(|item| !is_link(item));
                        changes += before - items.len();
                        fields_changed |= before != items.len();
                    } else if is_link(value) {
                        *value = Value::Null;
                        changes += 1;
                        fields_changed = true;
                    }
                }
            }
            let updated = if fields_changed {
                replace_frontmatter(&format!("{prefix}{new_body}"), &fields)
            } else {
                format!("{prefix}{new_body}")
            };
            (updated, changes)
        };

        if changes == 0 {
            return Ok(self.report(source, IndexOutcome::Unchanged, 0));
        }
        let outcome = self.write_through(&source, &updated)?;
        Ok(self.report(source, outcome, changes))
    }

    /// Set and remove front matter fields (keys match case-insensitively).
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes.
    pub fn upsert_frontmatter(
        &mut self,
        note: &str,
        set: &Map<String, Value>,
        remove: &[String],
    ) -> VaultResult<MutationReport> {
        let path = self.store.require(note)?.path.clone();
        let content = self.read_note(&path)?;
        let mut fields = frontmatter_of(&content);
        let mut changes = 0usize;
        for (key, value) in set {
            let existing = field_key(&fields, key);
            if fields.get(&existing) != Some(value) {
                fields.remove(&existing);
                fields.insert(existing, value.clone());
                changes += 1;
            }
        }
        for key in remove {
            let existing = field_key(&fields, key);
            if fields.remove(&existing).is_some() {
                changes += 1;
            }
        }
        if changes == 0 {
            return Ok(self.report(path, IndexOutcome::Unchanged, 0));
        }
        let updated = replace_frontmatter(&content, &fields);
        let outcome = self.write_through(&path, &updated)?;
        Ok(self.report(path, outcome, changes))
    }

    /// Quick-create a note in the capture folder with a fresh id, a creation
    /// timestamp and the configured relation fields.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty title and `NotFound` for unknown related notes.
    pub fn capture(
        &mut self,
        title: &str,
        body: &str,
        tags: &[String],
        related: &[String],
    ) -> VaultResult<MutationReport> {
        let title = title.trim();
        if title.is_empty() {
            return Err(VaultError::invalid("title must not be empty"));
        }
        let id = new_short_id();
        let slug = slugify(title);
        let stem = if slug.is_empty() { id.clone() } else { slug };
        let path = self.unique_note_path(&self.config.capture_dir, &stem)?;

        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.to_string()));
        fields.insert("id".into(), Value::String(id));
        fields.insert(
            "created".into(),
            Value::String(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
        );
        if !tags.is_empty() {
            fields.insert(
                "tags".into(),
                Value::Array(tags.iter().map(|tag| Value::String(tag.clone())).collect()),
            );
        }
        let mut related_links = Vec::new();
        for note in related {
            let target = self.store.require(note)?.path.clone();
            related_links.push(Value::String(format!("[[{}]]", self.link_text(&target))));
        }
        for (idx, relation) in self.config.capture_relations.iter().enumerate() {
            let values = if idx == 0 { related_links.clone() } else { Vec::new() };
            fields.insert(relation.clone(), Value::Array(values));
        }

        let mut content = render_frontmatter(&fields);
        let body = body.trim();
        if !body.is_empty() {
            content.push('\n');
            content.push_str(body);
            content.push('\n');
        }
        let outcome = self.write_through(&path, &content)?;
        Ok(self.report(path, outcome, 1))
    }

    /// Append a timestamped bullet to the daily journal note.
    ///
    /// # Errors
    /// Returns `InvalidInput` for empty text or a date not in `YYYY-MM-DD` form.
    pub fn journal_append(&mut self, text: &str, date: Option<&str>) -> VaultResult<MutationReport> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VaultError::invalid("text must not be empty"));
        }
        let now = Local::now();
        let day = match date {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|err| VaultError::invalid(format!("date {raw}: {err}")))?,
            None => now.date_naive(),
        };
        let day = day.format("%Y-%m-%d").to_string();
        let path = clean_relative(&join_folder(&self.config.journal_dir, &format!("{day}.md")))?;
        let mut content = match self.store.absolute_path(&path)? {
            abs if abs.is_file() => fs::read_to_string(&abs).map_err(|err| VaultError::io(&abs, err))?,
            _ => format!("# {day}\n\n"),
        };
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format!("- {} {text}\n", now.format("%H:%M")));
        let outcome = self.write_through(&path, &content)?;
        Ok(self.report(path, outcome, 1))
    }

    /// Rename a note and rewrite path or file-name links that pointed at it.
    /// Links by title, alias or id keep resolving and are left alone.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes and `InvalidInput` when the target exists.
    pub fn move_note(&mut self, from: &str, to: &str) -> VaultResult<MoveReport> {
        let old = self.store.require(from)?.path.clone();
        let new = ensure_note_extension(&self.store.relative_path(to)?);
        let old_abs = self.store.absolute_path(&old)?;
        let new_abs = self.store.absolute_path(&new)?;
        if new == old || new_abs.exists() || self.store.get(&new).is_some() {
            return Err(VaultError::invalid(format!("{new} already exists")));
        }

        let new_text = {
            let stem = stem_of(&new);
            let clashes = self
                .store
                .lookup()
                .paths_with_stem(&stem)
                .iter()
                .any(|path| *path != old);
            if clashes {
                trim_note_extension(&new).to_string()
            } else {
                stem
            }
        };
        let mut rewrites: Vec<(String, String, usize)> = Vec::new();
        for source in self.store.backlinks().sources_of(&old) {
            if source == old {
                continue;
            }
            let content = self.read_note(&source)?;
            let lookup = self.store.lookup();
            let points_at_old = |target: &str| {
                lookup
                    .resolve_exact(target)
                    .is_some_and(|(path, kind)| path == old && matches!(kind, MatchKind::Path | MatchKind::Stem))
            };
            let (updated, wiki_count) =
                rewrite_wikilinks(&content, |target| points_at_old(target).then(|| new_text.clone()));
            let (updated, markdown_count) = rewrite_markdown_links(&updated, &source, &source, |target| {
                points_at_old(target).then(|| new.clone())
            });
            let count = wiki_count + markdown_count;
            if count > 0 {
                rewrites.push((source, updated, count));
            }
        }

        // Relative links in the moved note are re-pointed from the new folder.
        let own_content = self.read_note(&old)?;
        let (rebased, rebased_links) = {
            let lookup = self.store.lookup();
            let same_folder = folder_of(&old) == folder_of(&new);
            rewrite_markdown_links(&own_content, &old, &new, |target| {
                let (path, kind) = lookup.resolve_exact(target)?;
                if !matches!(kind, MatchKind::Path | MatchKind::Stem) {
                    return None;
                }
                if path == old {
                    Some(new.clone())
                } else if same_folder {
                    None
                } else {
                    Some(path)
                }
            })
        };

        if let Some(parent) = new_abs.parent() {
            fs::create_dir_all(parent).map_err(|err| VaultError::io(parent, err))?;
        }
        fs::rename(&old_abs, &new_abs).map_err(|err| VaultError::io(&new_abs, err))?;
        if rebased_links > 0 {
            atomic_write_text(&new_abs, &rebased)?;
        }
        for (source, updated, _) in &rewrites {
            atomic_write_text(&self.store.absolute_path(source)?, updated)?;
        }

        self.store.remove(&old)?;
        self.store.index_one(&new)?;
        for (source, _, _) in &rewrites {
            self.store.index_one(source)?;
        }
        self.semantic.rename(&old, &new);
        let mut touched: Vec<&str> = rewrites.iter().map(|(source, _, _)| source.as_str()).collect();
        touched.push(new.as_str());
        self.after_change(&touched);

        Ok(MoveReport {
            links_rewritten: rewrites.iter().map(|(_, _, count)| count).sum(),
            rebased_links,
            rewritten: rewrites.into_iter().map(|(source, _, _)| source).collect(),
            from: old,
            to: new,
            revision: self.store.revision(),
        })
    }

    /// Copy a note under a new path with a fresh id and optional new title.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes and `InvalidInput` when the target exists.
    pub fn clone_note(&mut self, source: &str, to: Option<&str>, title: Option<&str>) -> VaultResult<MutationReport> {
        let src = self.store.require(source)?.path.clone();
        let target = match to {
            Some(raw) => {
                let rel = ensure_note_extension(&self.store.relative_path(raw)?);
                if self.store.get(&rel).is_some() || self.store.absolute_path(&rel)?.exists() {
                    return Err(VaultError::invalid(format!("{rel} already exists")));
                }
                rel
            }
            None => self.unique_note_path(folder_of(&src), &format!("{}-copy", stem_of(&src)))?,
        };
        let content = self.read_note(&src)?;
        let mut fields = frontmatter_of(&content);
        let id_key = field_key(&fields, "id");
        fields.insert(id_key, Value::String(new_short_id()));
        if let Some(title) = title.map(str::trim).filter(|title| !title.is_empty()) {
            let title_key = field_key(&fields, "title");
            fields.insert(title_key, Value::String(title.to_string()));
        }
        let updated = replace_frontmatter(&content, &fields);
        let outcome = self.write_through(&target, &updated)?;
        Ok(self.report(target, outcome, 1))
    }

    /// Delete a note from disk and the index.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown notes.
    pub fn delete(&mut self, note: &str) -> VaultResult<DeleteReport> {
        let path = self.store.require(note)?.path.clone();
        let abs = self.store.absolute_path(&path)?;
        let dangling_sources: Vec<String> = self
            .store
            .backlinks()
            .sources_of(&path)
            .into_iter()
            .filter(|source| *source != path)
            .collect();
        match fs::remove_file(&abs) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(VaultError::io(&abs, err)),
        }
        self.store.remove(&path)?;
        self.after_change(&[path.as_str()]);
        Ok(DeleteReport {
            path,
            dangling_sources,
            revision: self.store.revision(),
        })
    }

    /// Rewrite broken wikilinks that have exactly one candidate; report the rest.
    ///
    /// # Errors
    /// Returns `NotFound` when `note` is given and does not resolve.
    pub fn repair_links(&mut self, note: Option<&str>, dry_run: bool) -> VaultResult<RepairReport> {
        let sources: Vec<String> = match note {
            Some(note) => vec![self.store.require(note)?.path.clone()],
            None => self.store.documents().map(|doc| doc.path.clone()).collect(),
        };
        let mut report = RepairReport {
            dry_run,
            ..RepairReport::default()
        };
        let mut plans: Vec<(String, HashMap<String, String>)> = Vec::new();
        for source in sources {
            let Some(doc) = self.store.get(&source) else {
                continue;
            };
            let mut replacements: HashMap<String, String> = HashMap::new();
            for dangling in dangling_refs(doc, self.store.lookup()) {
                let suggestions = suggest(self.store.documents(), &dangling.target, MAX_SUGGESTIONS);
                if let [only] = suggestions.as_slice() {
                    replacements.insert(clean_reference(&dangling.target).to_lowercase(), self.link_text(only));
                    report.repaired.push(RepairedLink {
                        source: source.clone(),
                        from: dangling.target,
                        to: only.clone(),
                    });
                } else {
                    report.unresolved.push(UnresolvedLink {
                        source: source.clone(),
                        target: dangling.target,
                        relation: dangling.relation,
                        suggestions,
                    });
                }
            }
            if !replacements.is_empty() {
                plans.push((source, replacements));
            }
        }

        if !dry_run {
            for (source, replacements) in plans {
                let content = self.read_note(&source)?;
                let (updated, count) = rewrite_wikilinks(&content, |target| {
                    replacements.get(&clean_reference(target).to_lowercase()).cloned()
                });
                if count > 0 {
                    self.write_through(&source, &updated)?;
                }
            }
        }
        report.revision = self.store.revision();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_at_end_of_existing_section() {
        let content = "---\ntitle: X\n---\n# X\n\n## Tasks\n- one\n\n## Notes\nbody\n";
        let updated = append_under_heading(content, "tasks", "- two");
        assert_eq!(
            updated,
            "---\ntitle: X\n---\n# X\n\n## Tasks\n- one\n- two\n\n## Notes\nbody\n"
        );
    }

    #[test]
    fn headings_in_code_fences_are_ignored() {
        let content = "# X\n\n```\n## Links\n```\n";
        let updated = append_under_heading(content, "Links", "- [[Y]]");
        assert_eq!(updated, "# X\n\n```\n## Links\n```\n\n## Links\n\n- [[Y]]\n");
    }

    #[test]
    fn slugs_keep_unicode_letters() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("Заметка о графе"), "заметка-о-графе");
        assert_eq!(slugify("!!!"), "");
    }
}
