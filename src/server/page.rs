use super::error::ApiError;
use super::summary::{run_url, RunSummary};
use crate::markers;
use crate::types::{DEFAULT_ANCHOR_UNITS, DEFAULT_MIN_SIMILARITY, DEFAULT_THREADS};
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin:.6rem 0 .2rem}pre{background:#f4f4f4;padding:.5rem;overflow-x:auto;max-height:20rem}\
.error{border-left:4px solid #c0392b;padding:.5rem 1rem;background:#fdecea}table{border-collapse:collapse}\
td,th{padding:.2rem .6rem;text-align:left;border-bottom:1px solid #ddd}";

pub(crate) fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{STYLE}</style></head><body>\n<h1>MSIanalyzer</h1>\n{body}\n</body></html>\n",
        html_escape(title)
    )
}

/// Upload form posting to `/v1/analyses`.
pub(crate) fn render_form() -> String {
    let mut options = String::new();
    for marker in markers::catalog() {
        let _ = write!(
            options,
            "<option value=\"{}\">{} ({})</option>",
            html_escape(&marker.name),
            html_escape(&marker.name),
            html_escape(&marker.motif)
        );
    }

    let body = format!(
        r#"<p>Upload FASTQ reads for one microsatellite marker. Built-in markers need no config file.</p>
<form method="post" action="/v1/analyses" enctype="multipart/form-data">
<label for="marker">Marker name</label>
<input id="marker" name="marker" list="builtin-markers" placeholder="BAT-26" required>
<datalist id="builtin-markers">{options}</datalist>
<label for="marker_config">Marker config (JSON, optional)</label>
<input id="marker_config" name="marker_config" type="file" accept=".json">
<label for="fastq">FASTQ files</label>
<input id="fastq" name="fastq" type="file" multiple accept=".fastq,.fq,.gz">
<fieldset><legend>Options</legend>
<label for="min_similarity">Minimum similarity</label>
<input id="min_similarity" name="min_similarity" type="number" min="0" max="1" step="0.01" value="{DEFAULT_MIN_SIMILARITY}">
<label for="anchor_units">Anchor units</label>
<input id="anchor_units" name="anchor_units" type="number" min="1" max="20" value="{DEFAULT_ANCHOR_UNITS}">
<label for="threads">Threads</label>
<input id="threads" name="threads" type="number" min="1" max="32" value="{DEFAULT_THREADS}">
<label><input name="run_tests" type="checkbox"> Run statistical tests</label>
<label><input name="skip_variant_summary" type="checkbox"> Skip variant summary</label>
</fieldset>
<label for="group_map">Sample names (one <code>stub = SampleName</code> per line)</label>
<textarea id="group_map" name="group_map" rows="4" cols="50"></textarea>
<label for="pileup_fastq">Draw a pileup for FASTQ (file name, optional)</label>
<input id="pileup_fastq" name="pileup_fastq">
<p><button type="submit">Run analysis</button></p>
</form>"#
    );
    layout("MSIanalyzer", &body)
}

/// Results page for a finished run.
pub(crate) fn render_run(summary: &RunSummary) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h2>Run {} ({})</h2><p>Started {}</p>",
        html_escape(&summary.run_id),
        html_escape(&summary.marker),
        html_escape(&summary.created_at)
    );

    for step in &summary.steps {
        let _ = write!(
            body,
            "<h3>{}</h3><p><code>{}</code> finished in {} ms</p>",
            html_escape(&step.step),
            html_escape(&step.command),
            step.elapsed_ms
        );
        if !step.stdout.is_empty() {
            let _ = write!(body, "<details open><summary>stdout</summary><pre>{}</pre></details>", html_escape(&step.stdout));
        }
        if !step.stderr.is_empty() {
            let _ = write!(body, "<details><summary>stderr</summary><pre>{}</pre></details>", html_escape(&step.stderr));
        }
    }

    body.push_str("<h3>Output files</h3><table><tr><th>File</th><th>Kind</th><th>Size</th></tr>");
    for view in &summary.artifacts {
        let _ = write!(
            body,
            "<tr><td><a href=\"{}\" download>{}</a></td><td>{}</td><td>{}</td></tr>",
            html_escape(&view.download_url),
            html_escape(&view.artifact.relpath),
            view.artifact.kind,
            view.artifact.size
        );
    }
    body.push_str("</table>");

    let run = html_escape(&run_url(&summary.run_id));
    let mut fastq_options = String::new();
    for fastq in &summary.fastq_files {
        let _ = write!(
            fastq_options,
            "<option value=\"{0}\">{0} ({1} reads)</option>",
            html_escape(&fastq.name),
            fastq.reads
        );
    }
    let _ = write!(
        body,
        "<h3>Pileup</h3><form method=\"post\" action=\"{run}/pileup\">\
         <select name=\"fastq\">{fastq_options}</select> <button type=\"submit\">Draw pileup</button></form>\
         <form method=\"post\" action=\"{run}/clear\"><p><button type=\"submit\">Clear results</button></p></form>\
         <p><a href=\"/\">New analysis</a></p>"
    );

    layout(&format!("MSIanalyzer run {}", summary.run_id), &body)
}

pub(crate) fn render_error(err: &ApiError) -> String {
    let mut body = format!(
        "<div class=\"error\"><p><strong>{}</strong></p><p>{}</p></div>",
        html_escape(&err.code),
        html_escape(&err.message)
    );
    for key in ["stdout", "stderr"] {
        if let Some(text) = err.details.get(key).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                let _ = write!(body, "<h3>{key}</h3><pre>{}</pre>", html_escape(text));
            }
        }
    }
    body.push_str("<p><a href=\"/\">Back to the upload form</a></p>");
    layout("MSIanalyzer error", &body)
}
