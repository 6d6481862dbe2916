//! Research paper summarizer: ask the endpoint for a learning sequence of paper titles on a topic, look
//! every title up on a paper search service and summarize what was found.

use std::sync::Arc;
use log::{debug, info};
use crate::filler::{fill_present, Fill};
use crate::pipeline::{run_step, PipelineError, RunResult};
use crate::prompt::errors::PromptError;
use crate::prompt::{PartialPrompt, PromptTemplate};
use crate::utils::fetch::{Paper, SearchPapers};
use crate::utils::llm::{generate_text, Generate};
use crate::utils::postprocess::json::SchemaError;
use crate::utils::postprocess::lines::list_items;

pub const PIPELINE: &str = "research_papers";

pub const TITLES_TEMPLATE_STR: &str = "User gave us {{topic}} as a topic. We need to find relevant research papers for this topic. \
Understand the topic and give me the top {{top_search}} research paper's titles. Make sure the titles are relevant to the topic. \
All titles together should give a sequential learning path to the user. For example, if the topic is 'Linear Regression' and \
top_search is 3, the 1st paper should be the foundational paper, the 2nd a later paper which improved it further, and the same \
for the 3rd. Give me only the titles in the response and put each title on a new line.";

pub const DRAFT_TEMPLATE_STR: &str = "Using the following papers, draft the summarization of each paper on {{titles}}.\n\n\
{{papers}}Summarize the key points from these papers in a concise manner.\n\n Title: \n Citations: \n Abstract Summary: \n URL: \n";

const MISSING: &str = "N/A";

#[derive(Debug, Clone, Default)]
#[readonly::make]
pub struct PaperRecord {
    #[readonly]
    pub topic: String,
    /// How many papers to look for. read-only.
    #[readonly]
    pub top_search: usize,
    /// Titles suggested by the endpoint, at most `top_search`.
    pub titles: Vec<String>,
    /// Search hits in title order. A title without hits contributes nothing.
    pub papers: Vec<Paper>,
    pub summary: String,
}

impl PaperRecord {
    pub fn new(topic: impl Into<String>, top_search: usize) -> Self {
        Self {
            topic: topic.into(),
            top_search,
            ..Default::default()
        }
    }
}

impl Fill for PaperRecord {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError> {
        fill_present(partial_prompt, [
            ("topic", self.topic.clone()),
            ("top_search", self.top_search.to_string()),
            ("titles", self.titles.join(", ")),
            ("papers", render_papers(&self.papers)),
        ]);
        Ok(())
    }
}

fn render_papers(papers: &[Paper]) -> String {
    papers
        .iter()
        .map(|paper| {
            format!("Title: {}\nAbstract: {}\nURL: {}\nCitations: {}\n\n",
                    paper.title.as_deref().unwrap_or(MISSING),
                    paper.abstract_text.as_deref().unwrap_or(MISSING),
                    paper.url.as_deref().unwrap_or(MISSING),
                    paper.citation_count.map_or_else(|| MISSING.to_string(), |count| count.to_string()))
        })
        .collect()
}

pub struct ResearchPapers {
    endpoint: Arc<dyn Generate>,
    search: Arc<dyn SearchPapers>,
    titles_template: PromptTemplate,
    draft_template: PromptTemplate,
}

impl ResearchPapers {
    pub fn new(endpoint: Arc<dyn Generate>, search: Arc<dyn SearchPapers>) -> Self {
        Self {
            endpoint,
            search,
            titles_template: PromptTemplate::new(TITLES_TEMPLATE_STR),
            draft_template: PromptTemplate::new(DRAFT_TEMPLATE_STR),
        }
    }

    /// generate_titles -> fetch_papers -> draft_summary
    pub async fn run(&self, mut record: PaperRecord) -> RunResult<PaperRecord> {
        info!("{}: topic {:?}, {} papers", PIPELINE, record.topic, record.top_search);
        run_step!(PIPELINE, "generate_titles", record, self.generate_titles(&mut record).await);
        run_step!(PIPELINE, "fetch_papers", record, self.fetch_papers(&mut record).await);
        run_step!(PIPELINE, "draft_summary", record, self.draft_summary(&mut record).await);
        info!("{}: summarized {} papers", PIPELINE, record.papers.len());
        Ok(record)
    }

    pub async fn generate_titles(&self, record: &mut PaperRecord) -> Result<(), PipelineError> {
        let prompt = self.titles_template.render(&*record)?;
        let reply = generate_text(self.endpoint.as_ref(), &prompt).await?;
        let titles = list_items(&reply);
        if titles.len() < record.top_search {
            return Err(SchemaError::new(format!("{} paper titles, one per line", record.top_search),
                                        format!("got {} titles", titles.len()),
                                        reply).into());
        }
        record.titles = titles.into_iter().take(record.top_search).collect();
        Ok(())
    }

    /// One search per title, first hit only.
    pub async fn fetch_papers(&self, record: &mut PaperRecord) -> Result<(), PipelineError> {
        for title in &record.titles {
            let papers = self.search.search(title, 1).await?;
            if papers.is_empty() {
                debug!("no paper found for title {:?}", title);
            }
            record.papers.extend(papers);
        }
        Ok(())
    }

    pub async fn draft_summary(&self, record: &mut PaperRecord) -> Result<(), PipelineError> {
        let prompt = self.draft_prompt(record)?;
        debug!("draft prompt has {} chars", prompt.len());
        record.summary = generate_text(self.endpoint.as_ref(), &prompt).await?;
        Ok(())
    }

    pub fn draft_prompt(&self, record: &PaperRecord) -> Result<String, PromptError> {
        self.draft_template.render(record)
    }
}

#[cfg(test)]
mod test_research_papers {
    use std::sync::Arc;
    use super::{PaperRecord, ResearchPapers};
    use crate::pipeline::PipelineError;
    use crate::testing::{EchoSearch, ScriptedEndpoint};

    const TITLES_NEEDLE: &str = "research paper's titles";
    const DRAFT_NEEDLE: &str = "Using the following papers";

    fn app(titles: &str, search: Arc<EchoSearch>) -> (Arc<ScriptedEndpoint>, ResearchPapers) {
        let endpoint = Arc::new(ScriptedEndpoint::new()
            .reply(TITLES_NEEDLE, titles)
            .reply(DRAFT_NEEDLE, "the summary"));
        let app = ResearchPapers::new(endpoint.clone(), search);
        (endpoint, app)
    }

    #[tokio::test]
    async fn test_one_search_per_title() {
        let search = Arc::new(EchoSearch::default());
        let (endpoint, app) = app("1. Alpha\n2. Beta\n\n3. Gamma\n", search.clone());
        let record = app.run(PaperRecord::new("Linear Regression", 3)).await.unwrap();

        assert_eq!(vec!["Alpha", "Beta", "Gamma"], *search.queries.lock().unwrap());
        assert_eq!(3, record.papers.len());
        assert_eq!("the summary", record.summary);

        let draft = endpoint.prompts().into_iter().find(|p| p.contains(DRAFT_NEEDLE)).unwrap();
        let alpha = draft.find("Title: Alpha (paper)\nAbstract: abstract of Alpha\nURL: https://papers.example/Alpha\nCitations: 5").unwrap();
        let beta = draft.find("Title: Beta (paper)").unwrap();
        let gamma = draft.find("Title: Gamma (paper)").unwrap();
        assert!(alpha < beta && beta < gamma);
    }

    #[tokio::test]
    async fn test_extra_titles_are_dropped() {
        let search = Arc::new(EchoSearch::default());
        let (_, app) = app("A\nB\nC\nD", search.clone());
        let record = app.run(PaperRecord::new("graphs", 2)).await.unwrap();
        assert_eq!(vec!["A", "B"], record.titles);
        assert_eq!(2, search.queries.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_too_few_titles() {
        let search = Arc::new(EchoSearch::default());
        let (endpoint, app) = app("Only one", search.clone());
        let failure = app.run(PaperRecord::new("graphs", 3)).await.unwrap_err();
        assert_eq!("generate_titles", failure.step);
        assert!(matches!(failure.error, PipelineError::Schema(_)));
        assert!(search.queries.lock().unwrap().is_empty());
        assert!(failure.record.summary.is_empty());
        assert_eq!(0, endpoint.count_containing(DRAFT_NEEDLE));
    }

    #[tokio::test]
    async fn test_title_without_hits() {
        let search = Arc::new(EchoSearch { empty_for: Some("B".to_string()), ..Default::default() });
        let (_, app) = app("A\nB\nC", search);
        let record = app.run(PaperRecord::new("graphs", 3)).await.unwrap();
        let titles: Vec<_> = record.papers.iter().filter_map(|p| p.title.clone()).collect();
        assert_eq!(vec!["A (paper)", "C (paper)"], titles);
    }

    #[test]
    fn test_draft_prompt_is_deterministic() {
        let (_, app) = app("", Arc::new(EchoSearch::default()));
        let mut record = PaperRecord::new("graphs", 1);
        record.titles = vec!["A".to_string()];
        record.papers = vec![Default::default()];
        let prompt = app.draft_prompt(&record).unwrap();
        assert_eq!(prompt, app.draft_prompt(&record).unwrap());
        assert!(prompt.contains("Title: N/A\nAbstract: N/A\nURL: N/A\nCitations: N/A"));
    }
}
