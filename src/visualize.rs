use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::{HtmlDocument, TopicModel, VisualizationEngine};
use crate::error::{EngineError, PipelineError, Result};
use crate::vocabulary::{Corpus, Vocabulary};

pub const ARTIFACT_PREFIX: &str = "pyldavis_html_file_";
const ARTIFACT_EXTENSION: &str = "html";

/// Default relevance weight between topic probability and lift.
const DEFAULT_LAMBDA: f64 = 0.6;
/// Resolution of the λ grid used to pick the embedded terms.
const LAMBDA_STEPS: usize = 100;

/// Path of a written visualization. The file outlives the pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VisualizationArtifact {
    path: PathBuf,
}

impl VisualizationArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn remove(self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }
}

/// `<dir>/pyldavis_html_file_<YYYYmmdd-HHMMSS>.html`
pub fn artifact_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{ARTIFACT_PREFIX}{}.{ARTIFACT_EXTENSION}",
        at.format("%Y%m%d-%H%M%S")
    ))
}

/// Renders the model and writes it to a freshly timestamped file in `dir`.
///
/// `dir` must already exist.
pub fn export(
    engine: &dyn VisualizationEngine,
    model: &dyn TopicModel,
    corpus: &Corpus,
    vocabulary: &Vocabulary,
    dir: &Path,
) -> Result<VisualizationArtifact> {
    let document = engine.render(model, corpus, vocabulary);
    let path = artifact_path(dir, Local::now());
    let fail = |source| PipelineError::VisualizationWriteFailure {
        path: path.clone(),
        source,
    };

    let document = document.map_err(fail)?;
    if !dir.is_dir() {
        return Err(fail(EngineError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        ))));
    }
    engine.save(&document, &path).map_err(fail)?;

    info!(path = %path.display(), "visualization written");
    Ok(VisualizationArtifact { path })
}

fn is_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with(ARTIFACT_PREFIX)
        && path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
}

/// Visualization files in `dir`, oldest first.
pub fn list_artifacts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut artifacts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_artifact(&path) {
            artifacts.push(path);
        }
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Deletes every visualization file in `dir` and returns how many went away.
pub fn purge_artifacts(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for path in list_artifacts(dir)? {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "could not delete visualization"),
        }
    }
    Ok(removed)
}

#[derive(Debug, Serialize)]
struct TermEntry {
    term: String,
    /// Probability of the term within the topic.
    prob: f64,
    /// Probability of the term across the corpus.
    overall: f64,
    /// Expected occurrences of the term attributed to the topic.
    freq: f64,
}

#[derive(Debug, Serialize)]
struct TopicEntry {
    topic: usize,
    /// Share of corpus tokens attributed to the topic, in percent.
    prevalence: f64,
    terms: Vec<TermEntry>,
}

#[derive(Debug, Serialize)]
struct Payload {
    lambda: f64,
    total_tokens: usize,
    top_n: usize,
    topics: Vec<TopicEntry>,
}

/// Self-contained HTML explorer of topic prevalence and term relevance.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    /// Terms shown per topic.
    pub top_n: usize,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        HtmlRenderer { top_n: 30 }
    }
}

impl HtmlRenderer {
    fn payload(
        &self,
        model: &dyn TopicModel,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
    ) -> Result<Payload, EngineError> {
        let num_topics = model.num_topics();
        let total_tokens = corpus.total_tokens();
        if num_topics == 0 || total_tokens == 0 {
            return Err(EngineError::failed("nothing to visualize"));
        }
        let out_of_range = |id| EngineError::TermOutOfRange {
            id,
            len: vocabulary.len(),
        };

        let mut term_counts = vec![0usize; vocabulary.len()];
        let mut topic_mass = vec![0.0f64; num_topics];
        for document in corpus.documents() {
            let doc_len: usize = document.iter().map(|&(_, count)| count).sum();
            if doc_len == 0 {
                continue;
            }
            for &(id, count) in document {
                *term_counts.get_mut(id).ok_or_else(|| out_of_range(id))? += count;
            }
            for (mass, share) in topic_mass.iter_mut().zip(model.document_topics(document)) {
                *mass += doc_len as f64 * share;
            }
        }
        let overall: Vec<f64> = term_counts
            .iter()
            .map(|&count| count as f64 / total_tokens as f64)
            .collect();

        let topics = (0..num_topics)
            .map(|topic| {
                let ranked = model.topic_terms(topic, vocabulary.len());
                if let Some(&(id, _)) = ranked.iter().find(|&&(id, _)| id >= vocabulary.len()) {
                    return Err(out_of_range(id));
                }
                let keep = self.relevant_terms(&ranked, &overall);
                let terms = ranked
                    .into_iter()
                    .filter(|(id, _)| keep.contains(id))
                    .filter_map(|(id, prob)| {
                        Some(TermEntry {
                            term: vocabulary.token(id)?.to_string(),
                            prob,
                            overall: overall[id],
                            freq: prob * topic_mass[topic],
                        })
                    })
                    .collect();
                Ok(TopicEntry {
                    topic,
                    prevalence: 100.0 * topic_mass[topic] / total_tokens as f64,
                    terms,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Payload {
            lambda: DEFAULT_LAMBDA,
            total_tokens,
            top_n: self.top_n,
            topics,
        })
    }

    /// Ids of the terms that rank in the top `top_n` by relevance
    /// `λ·ln p + (1-λ)·ln(p / overall)` for some λ on the grid.
    fn relevant_terms(&self, ranked: &[(usize, f64)], overall: &[f64]) -> BTreeSet<usize> {
        let candidates: Vec<(usize, f64, f64)> = ranked
            .iter()
            .filter(|&&(id, prob)| prob > 0.0 && overall[id] > 0.0)
            .map(|&(id, prob)| (id, prob.ln(), (prob / overall[id]).ln()))
            .collect();

        let mut keep = BTreeSet::new();
        let mut scored = Vec::with_capacity(candidates.len());
        for step in 0..=LAMBDA_STEPS {
            let lambda = step as f64 / LAMBDA_STEPS as f64;
            scored.clear();
            scored.extend(candidates.iter().map(|&(id, ln_prob, ln_lift)| {
                (lambda * ln_prob + (1.0 - lambda) * ln_lift, id)
            }));
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            keep.extend(scored.iter().take(self.top_n).map(|&(_, id)| id));
        }
        keep
    }
}

impl VisualizationEngine for HtmlRenderer {
    fn render(
        &self,
        model: &dyn TopicModel,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
    ) -> Result<HtmlDocument, EngineError> {
        let payload = self.payload(model, corpus, vocabulary)?;
        // Keep the inline script from being closed early by term text.
        let data = serde_json::to_string(&payload)?.replace("</", "<\\/");
        Ok(HtmlDocument {
            html: HTML_TEMPLATE.replace("__TOPICVIEW_DATA__", &data),
        })
    }

    fn save(&self, document: &HtmlDocument, path: &Path) -> Result<(), EngineError> {
        fs::write(path, &document.html)?;
        Ok(())
    }
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Topic View</title>
<style>
body {
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  margin: 24px;
  color: #222;
}
#layout { display: flex; gap: 32px; }
#topics { min-width: 260px; }
.topic { cursor: pointer; margin: 4px 0; }
.topic .bar { display: inline-block; height: 14px; background: #9ecae1; vertical-align: middle; }
.topic.active .bar { background: #d6604d; }
.term { display: flex; align-items: center; margin: 2px 0; font-size: 13px; }
.term .label { width: 140px; text-align: right; padding-right: 8px; }
.term .overall { height: 12px; background: #c6dbef; position: relative; }
.term .within { height: 12px; background: #d6604d; position: absolute; left: 0; top: 0; }
</style>
</head>
<body>
<h2>Topic View</h2>
<div>
  <label for="lambda">Relevance &lambda; = <span id="lambda-value"></span></label>
  <input id="lambda" type="range" min="0" max="1" step="0.01">
</div>
<div id="layout">
  <div id="topics"><h3>Topics (share of tokens)</h3></div>
  <div id="terms"><h3 id="terms-title"></h3><div id="term-list"></div></div>
</div>
<script>
const data = __TOPICVIEW_DATA__;
let selected = 0;
let lambda = data.lambda;

function relevance(t) {
  return lambda * Math.log(t.prob) + (1 - lambda) * Math.log(t.prob / t.overall);
}

function drawTopics() {
  const box = document.getElementById("topics");
  box.querySelectorAll(".topic").forEach(e => e.remove());
  data.topics.forEach(topic => {
    const row = document.createElement("div");
    row.className = "topic" + (topic.topic === selected ? " active" : "");
    row.innerHTML = "<span class='bar' style='width:" + (2 * topic.prevalence) +
      "px'></span> Topic " + (topic.topic + 1) + " (" + topic.prevalence.toFixed(1) + "%)";
    row.onclick = () => { selected = topic.topic; draw(); };
    box.appendChild(row);
  });
}

function drawTerms() {
  const topic = data.topics[selected];
  document.getElementById("terms-title").textContent =
    "Top " + data.top_n + " terms for topic " + (selected + 1);
  const list = document.getElementById("term-list");
  list.innerHTML = "";
  const terms = topic.terms.slice()
    .sort((a, b) => relevance(b) - relevance(a))
    .slice(0, data.top_n);
  const scale = Math.max(...terms.map(t => t.overall * data.total_tokens), 1);
  terms.forEach(t => {
    const row = document.createElement("div");
    row.className = "term";
    const total = t.overall * data.total_tokens;
    const within = Math.min(t.freq, total);
    row.innerHTML = "<span class='label'></span>" +
      "<span class='overall' style='width:" + (300 * total / scale) + "px'>" +
      "<span class='within' style='width:" + (300 * within / scale) + "px'></span></span>";
    row.querySelector(".label").textContent = t.term;
    list.appendChild(row);
  });
}

function draw() {
  document.getElementById("lambda-value").textContent = lambda.toFixed(2);
  drawTopics();
  drawTerms();
}

const slider = document.getElementById("lambda");
slider.value = lambda;
slider.oninput = () => { lambda = parseFloat(slider.value); draw(); };
draw();
</script>
</body>
</html>
"#;
