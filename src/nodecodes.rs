//! Определения кодов для узлов и ребер.

use serde::{Deserialize, Serialize};

/// Типы узлов ASG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    // === Литералы ===
    /// Целочисленный литерал (i64, payload: 8 bytes little-endian)
    LiteralInt,
    /// Литерал с плавающей точкой (f64, payload: 8 bytes little-endian)
    LiteralFloat,
    /// Булевый литерал (payload: 1 byte, 0=false, 1=true)
    LiteralBool,
    /// Строковый литерал (payload: UTF-8 bytes)
    LiteralString,
    /// nil / () (нет payload)
    LiteralNil,

    // === Арифметические операции ===
    /// Сложение
    Add,
    /// Вычитание
    Sub,
    /// Умножение
    Mul,
    /// Деление
    Div,
    /// Остаток от деления
    Mod,
    /// Унарный минус
    Neg,

    // === Операции сравнения ===
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // === Логические операции ===
    And,
    Or,
    Not,

    // === Управляющие конструкции ===
    /// Условное выражение if/else
    If,
    /// Блок выражений (последовательное выполнение)
    Block,
    /// Цикл while
    Loop,
    /// Повторение тела n раз: (times n body...)
    Times,

    // === Функции ===
    /// Определение функции (payload: имя функции UTF-8)
    Function,
    /// Вызов функции
    Call,
    /// Лямбда-выражение
    Lambda,
    /// Параметр функции (payload: имя параметра UTF-8)
    Parameter,

    // === Переменные ===
    /// Объявление переменной (payload: имя переменной UTF-8)
    Variable,
    /// Ссылка на переменную (payload: имя переменной UTF-8)
    VarRef,
    /// Присваивание
    Assign,

    // === Массивы ===
    Array,
    ArrayIndex,
    ArrayLength,

    // === Встроенные ===
    /// Печать значения: (print expr)
    Print,
    /// Пауза текущего контекста: (sleep ms)
    Sleep,
    /// Выбросить ошибку: (throw msg)
    Throw,
    /// Проверка на ошибку: (is-error v)
    IsError,
    /// Проверка на nil: (is-nil v)
    IsNil,

    // === Потоки ===
    /// Запуск потока: (thread f args...)
    ThreadSpawn,
    /// Ожидание потока: (thread-join t)
    ThreadJoin,
    /// Состояние потока: (thread-state t)
    ThreadState,
    /// Идентификатор потока: (thread-id t)
    ThreadId,
}

/// Типы рёбер ASG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    // === Общие аргументы ===
    /// Аргумент применения (универсальный)
    ApplicationArgument,
    /// Первый операнд бинарной операции
    FirstOperand,
    /// Второй операнд бинарной операции
    SecondOperand,

    // === Управляющий поток ===
    /// Условие (для If, Loop)
    Condition,
    /// Ветка "then" (для If)
    ThenBranch,
    /// Ветка "else" (для If)
    ElseBranch,
    /// Тело цикла
    LoopBody,
    /// Число повторений (для Times)
    LoopCount,
    /// Выражение в блоке
    BlockStatement,

    // === Функции ===
    /// Тело функции
    FunctionBody,
    /// Параметр функции
    FunctionParameter,
    /// Целевая функция для вызова
    CallTarget,
    /// Аргумент вызова функции
    CallArgument,

    // === Переменные ===
    /// Значение переменной
    VarValue,
    /// Цель присваивания
    AssignTarget,
    /// Присваиваемое значение
    AssignValue,

    // === Массивы ===
    /// Элемент массива
    ArrayElement,
    /// Выражение индекса
    ArrayIndexExpr,

    // === Потоки ===
    /// Вызываемое значение, запускаемое в потоке
    ThreadCallable,
    /// Аргумент, связываемый с параметром потока
    ThreadArgument,
}
