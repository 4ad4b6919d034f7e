//! # Generador de Archivos
//! src/files.rs
//!
//! Colaborador que produce un archivo pequeño por tarea. Cada tipo tiene un
//! nombre fijo y se escribe en `dir/task_{id}/{nombre}`, de modo que el
//! nombre base del archivo es el que termina dentro del ZIP.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::batch::TaskId;

/// Tipos de archivo soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Report,
    Csv,
    Json,
    Log,
    Markdown,
}

impl FileKind {
    /// En el orden en que el flujo de archivo los asigna a las tareas 1..=5
    pub const ALL: [FileKind; 5] = [
        FileKind::Report,
        FileKind::Csv,
        FileKind::Json,
        FileKind::Log,
        FileKind::Markdown,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            FileKind::Report => "report.txt",
            FileKind::Csv => "data.csv",
            FileKind::Json => "config.json",
            FileKind::Log => "log.log",
            FileKind::Markdown => "summary.md",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Report => "text",
            FileKind::Csv => "csv",
            FileKind::Json => "json",
            FileKind::Log => "log",
            FileKind::Markdown => "markdown",
        }
    }

    fn render(&self, task_id: TaskId) -> String {
        let now = Local::now();
        let millis = now.timestamp_millis();

        match self {
            FileKind::Report => format!(
                "Report for task {}.\nGenerated at: {}\n",
                task_id,
                now.format("%Y-%m-%d %H:%M:%S")
            ),
            FileKind::Csv => format!(
                "id,name,value,task\n1,Item1,100,{t}\n2,Item2,200,{t}\n3,Item3,300,{t}\n",
                t = task_id
            ),
            FileKind::Json => serde_json::json!({
                "taskId": task_id,
                "status": "completed",
                "timestamp": millis,
            })
            .to_string(),
            FileKind::Log => format!(
                "[INFO] task {id} started\n[INFO] task {id} completed\n[INFO] timestamp: {ts}\n",
                id = task_id,
                ts = millis
            ),
            FileKind::Markdown => format!(
                "# Task {} summary\n\n- status: completed\n- timestamp: {}\n- generator: FileGenerator\n",
                task_id, millis
            ),
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Archivo temporal producido por una tarea
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub task_id: TaskId,
    pub name: String,
    pub path: PathBuf,
    pub kind: FileKind,
    pub size: u64,
}

/// Escribe los archivos de las tareas dentro de un directorio base
#[derive(Debug, Clone)]
pub struct FileGenerator {
    dir: PathBuf,
}

impl FileGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Crea el archivo de `kind` para `task_id`
    pub fn produce(&self, kind: FileKind, task_id: TaskId) -> io::Result<GeneratedFile> {
        debug!(task_id, kind = %kind, "creating file");

        if !self.dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("output directory {} does not exist", self.dir.display()),
            ));
        }

        // `create_dir` y no `create_dir_all`: no se recrea un directorio base ya borrado
        let task_dir = self.dir.join(format!("task_{}", task_id));
        match fs::create_dir(&task_dir) {
            Err(e) if e.kind() != io::ErrorKind::AlreadyExists => return Err(e),
            _ => {}
        }

        let path = task_dir.join(kind.file_name());
        fs::write(&path, kind.render(task_id))?;
        let size = fs::metadata(&path)?.len();

        info!(task_id, file = kind.file_name(), size, "file created");

        Ok(GeneratedFile {
            task_id,
            name: kind.file_name().to_string(),
            path,
            kind,
            size,
        })
    }

    /// Siempre falla, sin tocar el disco
    pub fn produce_failing(&self, kind: FileKind, task_id: TaskId) -> io::Result<GeneratedFile> {
        debug!(task_id, kind = %kind, "creating file that is set up to fail");

        Err(io::Error::other(format!(
            "intentional failure: task {} could not create {} file",
            task_id,
            kind.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_names_per_kind() {
        let names: Vec<_> = FileKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(
            names,
            vec!["report.txt", "data.csv", "config.json", "log.log", "summary.md"]
        );
        assert_eq!(FileKind::Markdown.label(), "markdown");
    }

    #[test]
    fn test_produce_writes_under_task_directory() {
        let dir = TempDir::new().unwrap();
        let generator = FileGenerator::new(dir.path());

        let file = generator.produce(FileKind::Csv, 7).unwrap();

        assert_eq!(file.task_id, 7);
        assert_eq!(file.name, "data.csv");
        assert_eq!(file.path, dir.path().join("task_7").join("data.csv"));
        assert_eq!(file.size, fs::metadata(&file.path).unwrap().len());
        assert!(fs::read_to_string(&file.path).unwrap().contains(",7\n"));
    }

    #[test]
    fn test_bodies_carry_task_id() {
        let dir = TempDir::new().unwrap();
        let generator = FileGenerator::new(dir.path());

        for kind in FileKind::ALL {
            let file = generator.produce(kind, 42).unwrap();
            let body = fs::read_to_string(&file.path).unwrap();
            assert!(body.contains("42"), "{} body: {}", kind, body);
            assert!(file.size > 0);
        }
    }

    #[test]
    fn test_json_body_is_valid() {
        let dir = TempDir::new().unwrap();
        let file = FileGenerator::new(dir.path()).produce(FileKind::Json, 3).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file.path).unwrap()).unwrap();
        assert_eq!(value["taskId"], 3);
        assert_eq!(value["status"], "completed");
    }

    #[test]
    fn test_produce_fails_when_directory_is_missing() {
        let dir = TempDir::new().unwrap();
        let generator = FileGenerator::new(dir.path().join("missing"));

        let err = generator.produce(FileKind::Report, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_produce_failing_has_descriptive_message() {
        let dir = TempDir::new().unwrap();
        let generator = FileGenerator::new(dir.path());

        let err = generator.produce_failing(FileKind::Csv, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "intentional failure: task 2 could not create csv file"
        );
        assert!(!dir.path().join("task_2").exists());
    }
}
