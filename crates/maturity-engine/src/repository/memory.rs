use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{AssessmentRepository, RepositoryError, RuleRepository, SuggestionRepository};
use crate::assessment::{
    Assessment, AssessmentId, Question, QuestionId, ResponseRecord, Section, SectionId,
};
use crate::suggestions::{GeneratedSuggestion, RuleRecord, RuleScope};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct AssessmentTables {
    assessments: HashMap<AssessmentId, Assessment>,
    sections: BTreeMap<SectionId, Section>,
    questions: BTreeMap<QuestionId, Question>,
    responses: HashMap<AssessmentId, BTreeMap<QuestionId, ResponseRecord>>,
}

/// Process-local assessment store. Keeps one response per (assessment, question).
#[derive(Default, Clone)]
pub struct InMemoryAssessmentStore {
    tables: Arc<Mutex<AssessmentTables>>,
}

impl InMemoryAssessmentStore {
    pub fn insert_section(&self, section: Section) {
        lock(&self.tables)
            .sections
            .insert(section.id.clone(), section);
    }

    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = lock(&self.tables).sections.values().cloned().collect();
        sections.sort_by_key(|section| section.order);
        sections
    }

    pub fn insert_question(&self, question: Question) {
        lock(&self.tables)
            .questions
            .insert(question.id.clone(), question);
    }
}

impl AssessmentRepository for InMemoryAssessmentStore {
    fn insert(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables);
        if tables.assessments.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.assessments.insert(assessment.id.clone(), assessment);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(lock(&self.tables).assessments.get(id).cloned())
    }

    fn update(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables);
        match tables.assessments.get_mut(&assessment.id) {
            Some(existing) => {
                *existing = assessment;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn assessment_ids(&self) -> Result<Vec<AssessmentId>, RepositoryError> {
        let mut ids: Vec<AssessmentId> = lock(&self.tables).assessments.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn questions(&self) -> Result<Vec<Question>, RepositoryError> {
        Ok(lock(&self.tables).questions.values().cloned().collect())
    }

    fn delete_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<Option<Question>, RepositoryError> {
        let mut tables = lock(&self.tables);
        for responses in tables.responses.values_mut() {
            responses.remove(question_id);
        }
        Ok(tables.questions.remove(question_id))
    }

    fn responses(&self, id: &AssessmentId) -> Result<Vec<ResponseRecord>, RepositoryError> {
        Ok(lock(&self.tables)
            .responses
            .get(id)
            .map(|responses| responses.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_response(
        &self,
        id: &AssessmentId,
        response: ResponseRecord,
    ) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables);
        if !tables.assessments.contains_key(id) {
            return Err(RepositoryError::NotFound);
        }
        tables
            .responses
            .entry(id.clone())
            .or_default()
            .insert(response.question_id.clone(), response);
        Ok(())
    }

    fn remove_response(
        &self,
        id: &AssessmentId,
        question_id: &QuestionId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = lock(&self.tables);
        Ok(tables
            .responses
            .get_mut(id)
            .map(|responses| responses.remove(question_id).is_some())
            .unwrap_or(false))
    }
}

/// Rule store seeded by the administrative surface; serves active rules only.
#[derive(Default, Clone)]
pub struct InMemoryRuleStore {
    rules: Arc<Mutex<Vec<RuleRecord>>>,
}

impl InMemoryRuleStore {
    pub fn from_records(records: Vec<RuleRecord>) -> Self {
        Self {
            rules: Arc::new(Mutex::new(records)),
        }
    }

    pub fn insert(&self, record: RuleRecord) {
        lock(&self.rules).push(record);
    }

    pub fn set_active(&self, id: &str, active: bool) -> bool {
        let mut rules = lock(&self.rules);
        let mut found = false;
        for rule in rules.iter_mut().filter(|rule| rule.id.0 == id) {
            rule.is_active = active;
            found = true;
        }
        found
    }
}

impl RuleRepository for InMemoryRuleStore {
    fn active_rules(&self, scope: RuleScope) -> Result<Vec<RuleRecord>, RepositoryError> {
        Ok(lock(&self.rules)
            .iter()
            .filter(|rule| rule.is_active && rule.scope == scope)
            .cloned()
            .collect())
    }
}

/// Suggestion sets keyed by assessment; a replace swaps the whole set under one lock.
#[derive(Default, Clone)]
pub struct InMemorySuggestionStore {
    sets: Arc<Mutex<HashMap<AssessmentId, Vec<GeneratedSuggestion>>>>,
}

impl SuggestionRepository for InMemorySuggestionStore {
    fn replace(
        &self,
        id: &AssessmentId,
        suggestions: Vec<GeneratedSuggestion>,
    ) -> Result<(), RepositoryError> {
        let mut sets = lock(&self.sets);
        if suggestions.is_empty() {
            sets.remove(id);
        } else {
            sets.insert(id.clone(), suggestions);
        }
        Ok(())
    }

    fn list(&self, id: &AssessmentId) -> Result<Vec<GeneratedSuggestion>, RepositoryError> {
        Ok(lock(&self.sets).get(id).cloned().unwrap_or_default())
    }
}
